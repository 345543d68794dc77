//! Trait seam over the live group-space API
//!
//! The engine never talks to the remote collaboration platform directly;
//! captures go through [`SpaceReader`] and restores through
//! [`SpaceMutator`]. Adapters for a concrete platform live with the host
//! process, and tests use the in-memory mock in `mock_host`.

use super::types::{ChannelId, RoleId, SpaceId, Timestamp, UserId};
use crate::core_snapshot::model::{ChannelKind, Overwrite, PermissionSet, RoleSpec};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the remote space API
#[derive(Debug, Clone, Error)]
pub enum SpaceApiError {
    /// The acting credential lacks permission for the mutation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Target entity (or grant subject) does not exist remotely
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection-level failure talking to the remote API
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything the taxonomy above does not cover
    #[error("unexpected API failure: {0}")]
    Unexpected(String),
}

pub type SpaceApiResult<T> = Result<T, SpaceApiError>;

/// Role as the live API reports it
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRole {
    pub id: String,
    pub name: String,
    pub color_value: u32,
    pub permission_set: PermissionSet,
    pub hierarchy_position: i64,
    pub is_hoisted: bool,
    pub is_mentionable: bool,
    /// Owned by an integration; cannot be re-created by hand
    pub is_managed: bool,
    /// The implicit everyone role every space carries
    pub is_everyone: bool,
}

impl LiveRole {
    /// Project onto the snapshot shape
    pub fn to_spec(&self) -> RoleSpec {
        RoleSpec {
            id: self.id.clone(),
            name: self.name.clone(),
            color_value: self.color_value,
            permission_set: self.permission_set.clone(),
            hierarchy_position: self.hierarchy_position,
            is_hoisted: self.is_hoisted,
            is_mentionable: self.is_mentionable,
        }
    }
}

/// Channel as the live API reports it, overwrites included
#[derive(Debug, Clone, PartialEq)]
pub struct LiveChannel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub hierarchy_position: i64,
    pub parent_id: Option<String>,
    pub topic: Option<String>,
    pub is_adult_only: Option<bool>,
    pub slow_mode_seconds: Option<u32>,
    pub bitrate: Option<u32>,
    pub user_limit: Option<u16>,
    pub overwrites: Vec<Overwrite>,
}

/// Member as the live API reports it
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMember {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub joined_at: Timestamp,
    /// Role ids held in the live space, everyone-role excluded
    pub role_refs: Vec<String>,
    pub permission_set: PermissionSet,
    /// Bots and other non-human accounts; never captured
    pub is_automated: bool,
}

/// Arguments for creating a channel in a destination space
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCreate {
    pub name: String,
    pub kind: ChannelKind,
    /// Destination-space category id, already remapped
    pub parent_id: Option<ChannelId>,
    pub topic: Option<String>,
    pub is_adult_only: Option<bool>,
    pub slow_mode_seconds: Option<u32>,
    pub bitrate: Option<u32>,
    pub user_limit: Option<u16>,
}

/// Read side of the live space API, used by the capture path
#[async_trait]
pub trait SpaceReader: Send + Sync {
    fn space_id(&self) -> SpaceId;
    fn name(&self) -> String;
    fn owner_id(&self) -> UserId;
    fn icon_ref(&self) -> Option<String>;
    fn banner_ref(&self) -> Option<String>;
    fn description(&self) -> Option<String>;

    /// Enumerate all roles, the implicit everyone role included
    async fn roles(&self) -> SpaceApiResult<Vec<LiveRole>>;

    /// Enumerate all channels with their permission overwrites
    async fn channels(&self) -> SpaceApiResult<Vec<LiveChannel>>;

    /// Enumerate all members, automated accounts included
    async fn members(&self) -> SpaceApiResult<Vec<LiveMember>>;
}

/// Write side of the live space API, used by the restore path
///
/// Every method is a destination mutation subject to remote rate limits;
/// callers pace themselves between calls.
#[async_trait]
pub trait SpaceMutator: Send + Sync {
    /// Create a role; the returned id belongs to the destination space
    async fn create_role(&self, role: &RoleSpec) -> SpaceApiResult<RoleId>;

    /// Create a channel; the returned id belongs to the destination space
    async fn create_channel(&self, create: &ChannelCreate) -> SpaceApiResult<ChannelId>;

    /// Create a permission overwrite on an existing channel
    async fn create_overwrite(
        &self,
        channel: &ChannelId,
        overwrite: &Overwrite,
    ) -> SpaceApiResult<()>;

    /// Add a member to the space on their behalf using a delegated-access token
    async fn add_member_with_grant(
        &self,
        member: &UserId,
        access_token: &str,
    ) -> SpaceApiResult<()>;

    /// Add a role to an existing membership
    async fn add_member_role(&self, member: &UserId, role: &RoleId) -> SpaceApiResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_role_to_spec() {
        let live = LiveRole {
            id: "r9".to_string(),
            name: "mods".to_string(),
            color_value: 0xFF_00_00,
            permission_set: vec!["BanMembers".to_string()],
            hierarchy_position: 4,
            is_hoisted: true,
            is_mentionable: false,
            is_managed: false,
            is_everyone: false,
        };

        let spec = live.to_spec();
        assert_eq!(spec.id, "r9");
        assert_eq!(spec.name, "mods");
        assert_eq!(spec.hierarchy_position, 4);
        assert!(spec.is_hoisted);
        assert!(!spec.is_mentionable);
    }

    #[test]
    fn test_error_display() {
        let err = SpaceApiError::PermissionDenied("create_role".to_string());
        assert_eq!(err.to_string(), "permission denied: create_role");

        let err = SpaceApiError::NotFound("member m1".to_string());
        assert!(err.to_string().contains("m1"));
    }
}
