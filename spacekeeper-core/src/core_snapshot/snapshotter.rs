/*
    snapshotter.rs - Capture path

    Reads the live state of a space and writes it to the store as one
    snapshot document keyed by the source space id, overwriting whatever
    capture came before. Excluded from the capture:

    - the implicit everyone role and integration-managed roles
    - automated (bot) members
    - auto-created default channels, when the exclusion predicate is on,
      so a later restore does not duplicate the defaults the platform
      creates on its own

    Capture failure is non-fatal to the host: `run` logs and reports
    false instead of raising.
*/

use super::model::{ChannelSpec, MemberSnapshot, SpaceSnapshot};
use crate::config::{CaptureConfig, Config};
use crate::core_space::host::{LiveChannel, SpaceApiError, SpaceReader};
use crate::core_space::types::Timestamp;
use crate::core_store::{to_document, DocumentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can abort a capture
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The live space could not be enumerated
    #[error("space read failed: {0}")]
    SpaceRead(#[from] SpaceApiError),

    /// The snapshot document could not be written
    #[error("snapshot store write failed: {0}")]
    Store(#[from] StoreError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Captures live space structure into snapshot documents
pub struct Snapshotter<S: DocumentStore> {
    store: Arc<S>,
    collection: String,
    capture: CaptureConfig,
}

impl<S: DocumentStore> Snapshotter<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            collection: config.store.snapshot_collection.clone(),
            capture: config.capture.clone(),
        }
    }

    /// Capture the space and persist the snapshot, returning it
    pub async fn capture<R: SpaceReader + ?Sized>(
        &self,
        space: &R,
    ) -> SnapshotResult<SpaceSnapshot> {
        let space_id = space.space_id();

        let roles = space.roles().await?;
        let channels = space.channels().await?;
        let members = space.members().await?;

        let mut role_specs: Vec<_> = roles
            .iter()
            .filter(|r| !r.is_everyone && !r.is_managed)
            .map(|r| r.to_spec())
            .collect();
        role_specs.sort_by_key(|r| r.hierarchy_position);

        let mut channel_specs: Vec<ChannelSpec> = channels
            .iter()
            .filter(|c| !self.is_auto_created_default(c))
            .map(channel_spec)
            .collect();
        channel_specs.sort_by_key(|c| c.hierarchy_position);

        let member_snapshots: Vec<MemberSnapshot> = members
            .iter()
            .filter(|m| !m.is_automated)
            .map(|m| MemberSnapshot {
                id: m.id.clone(),
                username: m.username.clone(),
                display_name: m.display_name.clone(),
                joined_at: m.joined_at,
                role_refs: m.role_refs.clone(),
                permission_set_at_capture: m.permission_set.clone(),
            })
            .collect();

        let snapshot = SpaceSnapshot {
            owner_id: space.owner_id(),
            source_space_id: space_id.clone(),
            source_space_name: space.name(),
            icon_ref: space.icon_ref(),
            banner_ref: space.banner_ref(),
            description: space.description(),
            member_count: member_snapshots.len(),
            roles: role_specs,
            channels: channel_specs,
            members: member_snapshots,
            captured_at: Timestamp::now(),
        };

        let document = to_document(&snapshot)?;
        self.store
            .put(&self.collection, space_id.as_str(), document)
            .await?;

        metrics::counter!("snapshots_captured_total").increment(1);
        info!(
            space = %space_id,
            roles = snapshot.roles.len(),
            channels = snapshot.channels.len(),
            members = snapshot.members.len(),
            "captured space snapshot"
        );
        Ok(snapshot)
    }

    /// Capture, reporting success as a bool; failures are logged only
    pub async fn run<R: SpaceReader + ?Sized>(&self, space: &R) -> bool {
        match self.capture(space).await {
            Ok(_) => true,
            Err(err) => {
                error!(space = %space.space_id(), error = %err, "space capture failed");
                false
            }
        }
    }

    /// Whether a channel matches the configured auto-created defaults
    fn is_auto_created_default(&self, channel: &LiveChannel) -> bool {
        self.capture.exclude_default_channels
            && self
                .capture
                .default_channel_names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&channel.name))
    }
}

fn channel_spec(live: &LiveChannel) -> ChannelSpec {
    ChannelSpec {
        id: live.id.clone(),
        name: live.name.clone(),
        kind: live.kind,
        hierarchy_position: live.hierarchy_position,
        parent_id: live.parent_id.clone(),
        topic: live.topic.clone(),
        is_adult_only: live.is_adult_only,
        slow_mode_seconds: live.slow_mode_seconds,
        bitrate: live.bitrate,
        user_limit: live.user_limit,
        overwrites: live.overwrites.clone(),
    }
}
