//! Test fixtures for snapshots and grants
//!
//! Builder and factory helpers shared by unit and integration tests.

use crate::core_grant::DelegationGrant;
use crate::core_snapshot::model::{
    ChannelKind, ChannelSpec, MemberSnapshot, Overwrite, OverwriteTargetKind, RoleSpec,
    SpaceSnapshot,
};
use crate::core_space::types::{SpaceId, Timestamp, UserId};
use std::time::Duration;

/// Builder for snapshot documents
pub struct TestSnapshotBuilder {
    owner: String,
    space_id: String,
    space_name: String,
    captured_at: Timestamp,
    roles: Vec<RoleSpec>,
    channels: Vec<ChannelSpec>,
    members: Vec<MemberSnapshot>,
}

impl TestSnapshotBuilder {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            space_id: "space-1".to_string(),
            space_name: "Test Space".to_string(),
            captured_at: Timestamp::now(),
            roles: Vec::new(),
            channels: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn space(mut self, id: &str, name: &str) -> Self {
        self.space_id = id.to_string();
        self.space_name = name.to_string();
        self
    }

    pub fn captured_at(mut self, millis: u64) -> Self {
        self.captured_at = Timestamp::from_millis(millis);
        self
    }

    pub fn role(mut self, id: &str, name: &str, position: i64) -> Self {
        self.roles.push(RoleSpec {
            id: id.to_string(),
            name: name.to_string(),
            color_value: 0,
            permission_set: Vec::new(),
            hierarchy_position: position,
            is_hoisted: false,
            is_mentionable: false,
        });
        self
    }

    pub fn category(mut self, id: &str, name: &str, position: i64) -> Self {
        self.channels
            .push(channel(id, name, ChannelKind::Category, position, None));
        self
    }

    pub fn text_channel(mut self, id: &str, name: &str, position: i64, parent: Option<&str>) -> Self {
        self.channels
            .push(channel(id, name, ChannelKind::Text, position, parent));
        self
    }

    pub fn voice_channel(mut self, id: &str, name: &str, position: i64, parent: Option<&str>) -> Self {
        let mut spec = channel(id, name, ChannelKind::Voice, position, parent);
        spec.bitrate = Some(64_000);
        spec.user_limit = Some(10);
        self.channels.push(spec);
        self
    }

    /// Attach a role-targeted overwrite to an already-added channel
    pub fn role_overwrite(
        mut self,
        channel_id: &str,
        role_id: &str,
        allow: Vec<String>,
        deny: Vec<String>,
    ) -> Self {
        self.push_overwrite(channel_id, role_id, OverwriteTargetKind::Role, allow, deny);
        self
    }

    /// Attach a member-targeted overwrite to an already-added channel
    pub fn member_overwrite(
        mut self,
        channel_id: &str,
        member_id: &str,
        allow: Vec<String>,
        deny: Vec<String>,
    ) -> Self {
        self.push_overwrite(channel_id, member_id, OverwriteTargetKind::Member, allow, deny);
        self
    }

    pub fn member(mut self, id: &str, username: &str, role_refs: Vec<&str>) -> Self {
        self.members.push(MemberSnapshot {
            id: UserId::new(id.to_string()),
            username: username.to_string(),
            display_name: username.to_string(),
            joined_at: Timestamp::from_millis(0),
            role_refs: role_refs.into_iter().map(str::to_string).collect(),
            permission_set_at_capture: Vec::new(),
        });
        self
    }

    pub fn build(self) -> SpaceSnapshot {
        SpaceSnapshot {
            owner_id: UserId::new(self.owner),
            source_space_id: SpaceId::new(self.space_id),
            source_space_name: self.space_name,
            icon_ref: None,
            banner_ref: None,
            description: None,
            member_count: self.members.len(),
            roles: self.roles,
            channels: self.channels,
            members: self.members,
            captured_at: self.captured_at,
        }
    }

    fn push_overwrite(
        &mut self,
        channel_id: &str,
        target_id: &str,
        target_kind: OverwriteTargetKind,
        allow: Vec<String>,
        deny: Vec<String>,
    ) {
        let entry = self
            .channels
            .iter_mut()
            .find(|c| c.id == channel_id)
            .unwrap_or_else(|| panic!("no channel {} in builder", channel_id));
        entry.overwrites.push(Overwrite {
            target_id: target_id.to_string(),
            target_kind,
            allow_set: allow,
            deny_set: deny,
        });
    }
}

fn channel(
    id: &str,
    name: &str,
    kind: ChannelKind,
    position: i64,
    parent: Option<&str>,
) -> ChannelSpec {
    ChannelSpec {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        hierarchy_position: position,
        parent_id: parent.map(str::to_string),
        topic: None,
        is_adult_only: None,
        slow_mode_seconds: None,
        bitrate: None,
        user_limit: None,
        overwrites: Vec::new(),
    }
}

/// A grant for `member` recorded in `space`, owned by "owner", expiring
/// `lifetime` from now
pub fn test_grant(member: &str, space: &str, lifetime: Duration) -> DelegationGrant {
    let now = Timestamp::now();
    DelegationGrant {
        member_id: UserId::new(member.to_string()),
        source_space_id: SpaceId::new(space.to_string()),
        owner_id: Some(UserId::new("owner".to_string())),
        access_token: format!("token-{}", member),
        refresh_token: None,
        token_kind: "Bearer".to_string(),
        scope: "identify spaces.join".to_string(),
        expires_at: now.plus(lifetime),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_wires_overwrites_to_channels() {
        let snapshot = TestSnapshotBuilder::new("owner")
            .category("c1", "Info", 0)
            .text_channel("ch1", "rules", 0, Some("c1"))
            .role_overwrite("ch1", "r1", vec![], vec![])
            .build();

        assert_eq!(snapshot.channels.len(), 2);
        let rules = snapshot.channels.iter().find(|c| c.id == "ch1").unwrap();
        assert_eq!(rules.overwrites.len(), 1);
        assert_eq!(rules.overwrites[0].target_kind, OverwriteTargetKind::Role);
    }

    #[test]
    #[should_panic(expected = "no channel")]
    fn test_overwrite_on_unknown_channel_panics() {
        TestSnapshotBuilder::new("owner").role_overwrite("nope", "r1", vec![], vec![]);
    }
}
