/*
    restorer.rs - Snapshot-driven space reconstruction

    Rebuilds a space from the owner's most recent snapshot in four
    strictly ordered phases:

      1. roles, ascending hierarchy position
      2. category channels
      3. remaining channels, each followed by its permission overwrites
      4. membership, via delegated-access grants, then per-member roles

    Source-space ids are remapped onto destination ids through per-run
    in-memory maps; the maps die with the run and are rebuilt next time.
    Every phase is best-effort per item: a rejected or failed mutation is
    recorded in the report and the phase moves on. Nothing short of a
    missing snapshot makes the run itself fail.
*/

use super::pacer::{CallClass, Pacer};
use super::report::{ItemOutcome, ItemReport, RestoreOutcome, RestoreReport, SkipReason};
use crate::config::Config;
use crate::core_grant::resolver::{GrantLookup, GrantResolver};
use crate::core_snapshot::model::{
    ChannelSpec, Overwrite, OverwriteTargetKind, SpaceSnapshot,
};
use crate::core_space::host::{ChannelCreate, SpaceApiError, SpaceMutator, SpaceReader};
use crate::core_space::types::{ChannelId, RoleId, UserId};
use crate::core_store::{from_document, DocumentStore, QueryOp};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives restoration runs against a destination space
pub struct Restorer<S: DocumentStore> {
    store: Arc<S>,
    resolver: GrantResolver<S>,
    pacer: Pacer,
    snapshot_collection: String,
}

impl<S: DocumentStore> Restorer<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        let resolver = GrantResolver::new(
            store.clone(),
            config.store.grant_collection.clone(),
            config.restore.grant_expiry_margin,
        );
        Self {
            store,
            resolver,
            pacer: Pacer::from_config(&config.restore),
            snapshot_collection: config.store.snapshot_collection.clone(),
        }
    }

    /// Restore the destination space from its owner's newest snapshot.
    /// `restored` is false only when the owner has no snapshot at all;
    /// per-item failures still yield a true outcome with a full report.
    pub async fn restore_latest<D>(&self, dest: &D) -> RestoreOutcome
    where
        D: SpaceReader + SpaceMutator,
    {
        let owner = dest.owner_id();
        let Some(snapshot) = self.latest_snapshot_for(&owner).await else {
            info!(owner = %owner, "no snapshot for owner, nothing to restore");
            return RestoreOutcome::default();
        };

        info!(
            owner = %owner,
            source = %snapshot.source_space_id,
            captured_at = %snapshot.captured_at,
            "restoring space from snapshot"
        );
        let report = self.restore_snapshot(dest, &snapshot).await;
        RestoreOutcome {
            restored: true,
            report,
        }
    }

    /// Newest snapshot owned by `owner`, if the store holds any
    pub async fn latest_snapshot_for(&self, owner: &UserId) -> Option<SpaceSnapshot> {
        let value = Value::String(owner.0.clone());
        let documents = match self
            .store
            .query_by_field(&self.snapshot_collection, "owner_id", QueryOp::Eq, &value)
            .await
        {
            Ok(documents) => documents,
            Err(err) => {
                warn!(owner = %owner, error = %err, "snapshot query failed, treating as no snapshot");
                return None;
            }
        };

        documents
            .into_iter()
            .filter_map(|doc| match from_document::<SpaceSnapshot>(doc) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    warn!(error = %err, "skipping malformed snapshot document");
                    None
                }
            })
            .max_by_key(|s| s.captured_at)
    }

    /// Run all four phases against the destination, reporting per item
    pub async fn restore_snapshot<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        snapshot: &SpaceSnapshot,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        // remap tables live exactly as long as this run
        let mut role_map: HashMap<String, RoleId> = HashMap::new();
        let mut channel_map: HashMap<String, ChannelId> = HashMap::new();

        self.restore_roles(dest, snapshot, &mut role_map, &mut report)
            .await;
        self.restore_categories(dest, snapshot, &mut channel_map, &mut report)
            .await;
        self.restore_channels(dest, snapshot, &role_map, &mut channel_map, &mut report)
            .await;
        self.restore_members(dest, snapshot, &role_map, &mut report)
            .await;

        metrics::counter!("restores_completed_total").increment(1);
        metrics::counter!("members_readded_total").increment(report.members_added() as u64);
        info!(
            roles = report.roles_created(),
            channels = report.channels_created(),
            members_added = report.members_added(),
            members_attempted = report.members_attempted(),
            "restoration run finished"
        );
        report
    }

    async fn restore_roles<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        snapshot: &SpaceSnapshot,
        role_map: &mut HashMap<String, RoleId>,
        report: &mut RestoreReport,
    ) {
        for role in snapshot.roles_in_creation_order() {
            let outcome = match dest.create_role(role).await {
                Ok(new_id) => {
                    role_map.insert(role.id.clone(), new_id);
                    ItemOutcome::Created
                }
                Err(err) => {
                    warn!(role = %role.name, error = %err, "role creation failed");
                    outcome_for(&err)
                }
            };
            report.roles.push(ItemReport::new(&role.id, &role.name, outcome));
            self.pacer.throttle(CallClass::Creation).await;
        }
    }

    async fn restore_categories<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        snapshot: &SpaceSnapshot,
        channel_map: &mut HashMap<String, ChannelId>,
        report: &mut RestoreReport,
    ) {
        for category in snapshot.categories() {
            let create = channel_create(category, None);
            let outcome = match dest.create_channel(&create).await {
                Ok(new_id) => {
                    channel_map.insert(category.id.clone(), new_id);
                    ItemOutcome::Created
                }
                Err(err) => {
                    warn!(channel = %category.name, error = %err, "category creation failed");
                    outcome_for(&err)
                }
            };
            report
                .channels
                .push(ItemReport::new(&category.id, &category.name, outcome));
            self.pacer.throttle(CallClass::Creation).await;
        }
    }

    async fn restore_channels<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        snapshot: &SpaceSnapshot,
        role_map: &HashMap<String, RoleId>,
        channel_map: &mut HashMap<String, ChannelId>,
        report: &mut RestoreReport,
    ) {
        for channel in snapshot.non_category_channels() {
            // a parent that was skipped (or never captured) demotes the
            // channel to top level rather than losing it
            let parent = channel
                .parent_id
                .as_ref()
                .and_then(|p| channel_map.get(p).cloned());
            let create = channel_create(channel, parent);

            let new_id = match dest.create_channel(&create).await {
                Ok(new_id) => {
                    channel_map.insert(channel.id.clone(), new_id.clone());
                    report
                        .channels
                        .push(ItemReport::new(&channel.id, &channel.name, ItemOutcome::Created));
                    Some(new_id)
                }
                Err(err) => {
                    warn!(channel = %channel.name, error = %err, "channel creation failed");
                    report
                        .channels
                        .push(ItemReport::new(&channel.id, &channel.name, outcome_for(&err)));
                    None
                }
            };
            self.pacer.throttle(CallClass::Creation).await;

            let Some(new_id) = new_id else {
                continue;
            };
            for overwrite in &channel.overwrites {
                self.restore_overwrite(dest, channel, &new_id, overwrite, role_map, report)
                    .await;
            }
        }
    }

    async fn restore_overwrite<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        channel: &ChannelSpec,
        new_channel: &ChannelId,
        overwrite: &Overwrite,
        role_map: &HashMap<String, RoleId>,
        report: &mut RestoreReport,
    ) {
        // role targets must point at this run's roles; member ids are
        // stable across spaces and pass through untouched
        let target_id = match overwrite.target_kind {
            OverwriteTargetKind::Role => match role_map.get(&overwrite.target_id) {
                Some(new_role) => new_role.0.clone(),
                None => {
                    debug!(
                        channel = %channel.name,
                        role = %overwrite.target_id,
                        "skipping overwrite for role not created this run"
                    );
                    report.overwrites.push(ItemReport::new(
                        &overwrite.target_id,
                        &channel.name,
                        ItemOutcome::Skipped(SkipReason::UnmappedRole),
                    ));
                    return;
                }
            },
            OverwriteTargetKind::Member => overwrite.target_id.clone(),
        };

        let remapped = Overwrite {
            target_id,
            target_kind: overwrite.target_kind,
            allow_set: overwrite.allow_set.clone(),
            deny_set: overwrite.deny_set.clone(),
        };
        let outcome = match dest.create_overwrite(new_channel, &remapped).await {
            Ok(()) => ItemOutcome::Created,
            Err(err) => {
                warn!(channel = %channel.name, error = %err, "overwrite creation failed");
                outcome_for(&err)
            }
        };
        report
            .overwrites
            .push(ItemReport::new(&overwrite.target_id, &channel.name, outcome));
        self.pacer.throttle(CallClass::Creation).await;
    }

    async fn restore_members<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        snapshot: &SpaceSnapshot,
        role_map: &HashMap<String, RoleId>,
        report: &mut RestoreReport,
    ) {
        // grant reads are not rate-limited; resolve everyone up front
        let lookups = join_all(snapshot.members.iter().map(|member| {
            self.resolver
                .resolve(&snapshot.owner_id, &snapshot.source_space_id, &member.id)
        }))
        .await;

        for (member, lookup) in snapshot.members.iter().zip(lookups) {
            let grant = match lookup {
                GrantLookup::Found(grant) => grant,
                GrantLookup::Expired => {
                    debug!(member = %member.username, "grant expired, member not attempted");
                    report.members.push(ItemReport::new(
                        member.id.as_str(),
                        &member.username,
                        ItemOutcome::Skipped(SkipReason::GrantExpired),
                    ));
                    continue;
                }
                GrantLookup::Missing => {
                    debug!(member = %member.username, "no grant found, member not attempted");
                    report.members.push(ItemReport::new(
                        member.id.as_str(),
                        &member.username,
                        ItemOutcome::Skipped(SkipReason::NoGrant),
                    ));
                    continue;
                }
            };

            let outcome = match dest
                .add_member_with_grant(&member.id, &grant.access_token)
                .await
            {
                Ok(()) => ItemOutcome::Created,
                Err(err) => {
                    warn!(member = %member.username, error = %err, "member re-admission failed");
                    outcome_for(&err)
                }
            };
            self.pacer.throttle(CallClass::Admission).await;

            if outcome.is_created() {
                self.grant_member_roles(dest, member.id.clone(), &member.role_refs, role_map)
                    .await;
            }
            report
                .members
                .push(ItemReport::new(member.id.as_str(), &member.username, outcome));
        }
    }

    /// Re-grant a re-admitted member's roles, one call at a time
    async fn grant_member_roles<D: SpaceMutator + ?Sized>(
        &self,
        dest: &D,
        member: UserId,
        role_refs: &[String],
        role_map: &HashMap<String, RoleId>,
    ) {
        for role_ref in role_refs {
            let Some(new_role) = role_map.get(role_ref) else {
                debug!(member = %member, role = %role_ref, "skipping role not created this run");
                continue;
            };
            if let Err(err) = dest.add_member_role(&member, new_role).await {
                warn!(member = %member, role = %new_role, error = %err, "role grant failed");
            }
            self.pacer.throttle(CallClass::Creation).await;
        }
    }
}

fn channel_create(channel: &ChannelSpec, parent: Option<ChannelId>) -> ChannelCreate {
    ChannelCreate {
        name: channel.name.clone(),
        kind: channel.kind,
        parent_id: parent,
        topic: channel.topic.clone(),
        is_adult_only: channel.is_adult_only,
        slow_mode_seconds: channel.slow_mode_seconds,
        bitrate: channel.bitrate,
        user_limit: channel.user_limit,
    }
}

fn outcome_for(err: &SpaceApiError) -> ItemOutcome {
    match err {
        SpaceApiError::PermissionDenied(_) => ItemOutcome::Skipped(SkipReason::PermissionDenied),
        SpaceApiError::NotFound(_) => ItemOutcome::Skipped(SkipReason::NotFound),
        other => ItemOutcome::Failed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_space::mock_host::{MockSpaceHost, Mutation};
    use crate::core_store::{to_document, MemoryStore};
    use crate::test_utils::fixtures::{test_grant, TestSnapshotBuilder};
    use std::time::Duration;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.restore.creation_delay = Duration::ZERO;
        config.restore.admission_delay = Duration::ZERO;
        config
    }

    async fn store_snapshot(store: &MemoryStore, snapshot: &SpaceSnapshot) {
        store
            .put(
                "space_snapshots",
                snapshot.source_space_id.as_str(),
                to_document(snapshot).unwrap(),
            )
            .await
            .unwrap();
    }

    async fn store_grant(store: &MemoryStore, grant: &crate::core_grant::DelegationGrant) {
        let key = format!("{}:{}", grant.source_space_id, grant.member_id);
        store
            .put("delegation_grants", &key, to_document(grant).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_snapshot_returns_false_with_zero_report() {
        let store = Arc::new(MemoryStore::new());
        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));

        let outcome = restorer.restore_latest(&dest).await;

        assert!(!outcome.restored);
        assert!(outcome.report.is_empty());
        assert_eq!(dest.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_query_failure_is_nothing_to_restore() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_reads(true);
        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));

        let outcome = restorer.restore_latest(&dest).await;
        assert!(!outcome.restored);
        assert_eq!(dest.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_newest_snapshot_wins() {
        let store = Arc::new(MemoryStore::new());
        let old = TestSnapshotBuilder::new("owner")
            .space("s-old", "Old Space")
            .captured_at(1_000)
            .role("r1", "legacy", 0)
            .build();
        let new = TestSnapshotBuilder::new("owner")
            .space("s-new", "New Space")
            .captured_at(2_000)
            .role("r1", "fresh", 0)
            .build();
        store_snapshot(&store, &old).await;
        store_snapshot(&store, &new).await;

        let restorer = Restorer::new(store, &test_config());
        let picked = restorer
            .latest_snapshot_for(&UserId::new("owner".to_string()))
            .await
            .unwrap();
        assert_eq!(picked.source_space_name, "New Space");
    }

    #[tokio::test]
    async fn test_restore_order_and_remapping() {
        // the canonical shape: two roles, one category, one text channel
        // under it carrying a role-targeted overwrite
        let snapshot = TestSnapshotBuilder::new("owner")
            .space("s1", "Source")
            .role("r2", "admin", 1)
            .role("r1", "mod", 0)
            .category("c1", "Info", 0)
            .text_channel("ch1", "rules", 0, Some("c1"))
            .role_overwrite("ch1", "r1", vec!["ViewChannel".to_string()], vec![])
            .build();

        let store = Arc::new(MemoryStore::new());
        store_snapshot(&store, &snapshot).await;
        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));

        let outcome = restorer.restore_latest(&dest).await;
        assert!(outcome.restored);
        assert_eq!(outcome.report.roles_created(), 2);
        assert_eq!(outcome.report.channels_created(), 2);
        assert_eq!(outcome.report.overwrites_created(), 1);

        let mutations = dest.mutations();
        assert_eq!(mutations.len(), 5);

        // mod (position 0) strictly before admin (position 1)
        let Mutation::RoleCreated { name, new_id: mod_id } = &mutations[0] else {
            panic!("expected role creation first, got {:?}", mutations[0]);
        };
        assert_eq!(name, "mod");
        assert!(matches!(&mutations[1], Mutation::RoleCreated { name, .. } if name == "admin"));

        // category before its child channel
        let Mutation::ChannelCreated { name, new_id: info_id, .. } = &mutations[2] else {
            panic!("expected category creation, got {:?}", mutations[2]);
        };
        assert_eq!(name, "Info");

        let Mutation::ChannelCreated { name, parent_id, new_id: rules_id, .. } = &mutations[3] else {
            panic!("expected channel creation, got {:?}", mutations[3]);
        };
        assert_eq!(name, "rules");
        assert_eq!(parent_id.as_ref(), Some(info_id));

        // overwrite target remapped to the new mod role, never "r1"
        let Mutation::OverwriteCreated { channel_id, target_id, .. } = &mutations[4] else {
            panic!("expected overwrite creation, got {:?}", mutations[4]);
        };
        assert_eq!(channel_id, rules_id);
        assert_eq!(target_id, mod_id.as_str());
        assert_ne!(target_id, "r1");
    }

    #[tokio::test]
    async fn test_unmapped_parent_demotes_to_top_level() {
        let snapshot = TestSnapshotBuilder::new("owner")
            .space("s1", "Source")
            .text_channel("ch1", "orphan", 0, Some("c-gone"))
            .build();

        let store = Arc::new(MemoryStore::new());
        store_snapshot(&store, &snapshot).await;
        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));

        restorer.restore_latest(&dest).await;

        assert!(matches!(
            &dest.mutations()[0],
            Mutation::ChannelCreated { parent_id: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_overwrite_for_skipped_role_is_not_created() {
        let snapshot = TestSnapshotBuilder::new("owner")
            .space("s1", "Source")
            .role("r1", "mod", 0)
            .text_channel("ch1", "rules", 0, None)
            .role_overwrite("ch1", "r1", vec![], vec![])
            .build();

        let store = Arc::new(MemoryStore::new());
        store_snapshot(&store, &snapshot).await;
        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));
        dest.deny("mod");

        let outcome = restorer.restore_latest(&dest).await;

        assert!(outcome.restored);
        assert_eq!(outcome.report.roles_created(), 0);
        assert_eq!(
            outcome.report.roles[0].outcome,
            ItemOutcome::Skipped(SkipReason::PermissionDenied)
        );
        assert_eq!(outcome.report.overwrites_created(), 0);
        assert_eq!(
            outcome.report.overwrites[0].outcome,
            ItemOutcome::Skipped(SkipReason::UnmappedRole)
        );
        // the channel itself still went through
        assert_eq!(outcome.report.channels_created(), 1);
    }

    #[tokio::test]
    async fn test_member_phase_counts_and_role_grants() {
        let snapshot = TestSnapshotBuilder::new("owner")
            .space("s1", "Source")
            .role("r1", "mod", 0)
            .member("m-granted", "ana", vec!["r1"])
            .member("m-expired", "bo", vec![])
            .member("m-missing", "cy", vec![])
            .build();

        let store = Arc::new(MemoryStore::new());
        store_snapshot(&store, &snapshot).await;
        store_grant(&store, &test_grant("m-granted", "s1", Duration::from_secs(3600))).await;
        store_grant(&store, &test_grant("m-expired", "s1", Duration::from_secs(60))).await;

        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));

        let outcome = restorer.restore_latest(&dest).await;
        let report = &outcome.report;

        assert_eq!(report.members_added(), 1);
        assert_eq!(report.members_attempted(), 1);
        assert_eq!(
            report.members[1].outcome,
            ItemOutcome::Skipped(SkipReason::GrantExpired)
        );
        assert_eq!(
            report.members[2].outcome,
            ItemOutcome::Skipped(SkipReason::NoGrant)
        );

        // ana got her remapped role after admission
        let mutations = dest.mutations();
        let added_at = mutations
            .iter()
            .position(|m| matches!(m, Mutation::MemberAdded { .. }))
            .unwrap();
        assert!(matches!(
            &mutations[added_at + 1],
            Mutation::MemberRoleGranted { member_id, .. }
                if member_id == &UserId::new("m-granted".to_string())
        ));
    }

    #[tokio::test]
    async fn test_denied_member_is_attempted_but_skipped() {
        let snapshot = TestSnapshotBuilder::new("owner")
            .space("s1", "Source")
            .member("m1", "ana", vec![])
            .build();

        let store = Arc::new(MemoryStore::new());
        store_snapshot(&store, &snapshot).await;
        store_grant(&store, &test_grant("m1", "s1", Duration::from_secs(3600))).await;

        let restorer = Restorer::new(store, &test_config());
        let dest = MockSpaceHost::new("dest", UserId::new("owner".to_string()));
        dest.deny("m1");

        let outcome = restorer.restore_latest(&dest).await;
        assert_eq!(outcome.report.members_attempted(), 1);
        assert_eq!(outcome.report.members_added(), 0);
        assert_eq!(
            outcome.report.members[0].outcome,
            ItemOutcome::Skipped(SkipReason::PermissionDenied)
        );
    }
}
