//! Mock space host for testing
//!
//! Implements both sides of the live-space seam against in-memory state,
//! recording every mutation in order so tests can assert creation
//! sequencing and id remapping without a real remote API.

use super::host::{
    ChannelCreate, LiveChannel, LiveMember, LiveRole, SpaceApiError, SpaceApiResult, SpaceMutator,
    SpaceReader,
};
use super::types::{ChannelId, RoleId, SpaceId, UserId};
use crate::core_snapshot::model::{ChannelKind, Overwrite, OverwriteTargetKind, RoleSpec};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One recorded destination mutation, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    RoleCreated {
        name: String,
        new_id: RoleId,
    },
    ChannelCreated {
        name: String,
        kind: ChannelKind,
        parent_id: Option<ChannelId>,
        new_id: ChannelId,
    },
    OverwriteCreated {
        channel_id: ChannelId,
        target_id: String,
        target_kind: OverwriteTargetKind,
    },
    MemberAdded {
        member_id: UserId,
    },
    MemberRoleGranted {
        member_id: UserId,
        role_id: RoleId,
    },
}

/// In-memory space implementing [`SpaceReader`] and [`SpaceMutator`]
pub struct MockSpaceHost {
    id: SpaceId,
    name: String,
    owner_id: UserId,
    icon_ref: Option<String>,
    banner_ref: Option<String>,
    description: Option<String>,
    roles: Mutex<Vec<LiveRole>>,
    channels: Mutex<Vec<LiveChannel>>,
    members: Mutex<Vec<LiveMember>>,
    mutations: Mutex<Vec<Mutation>>,
    /// Role/channel names and member ids whose mutations are rejected
    denied: Mutex<HashSet<String>>,
    fail_reads: Mutex<bool>,
    seq: AtomicU64,
}

impl MockSpaceHost {
    pub fn new(name: &str, owner_id: UserId) -> Self {
        Self {
            id: SpaceId::generate(),
            name: name.to_string(),
            owner_id,
            icon_ref: None,
            banner_ref: None,
            description: None,
            roles: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            members: Mutex::new(Vec::new()),
            mutations: Mutex::new(Vec::new()),
            denied: Mutex::new(HashSet::new()),
            fail_reads: Mutex::new(false),
            seq: AtomicU64::new(0),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Seed live state for capture tests
    pub fn seed_role(&self, role: LiveRole) {
        self.roles.lock().unwrap().push(role);
    }

    pub fn seed_channel(&self, channel: LiveChannel) {
        self.channels.lock().unwrap().push(channel);
    }

    pub fn seed_member(&self, member: LiveMember) {
        self.members.lock().unwrap().push(member);
    }

    /// Reject future mutations whose role/channel name or member id matches
    pub fn deny(&self, name_or_id: &str) {
        self.denied.lock().unwrap().insert(name_or_id.to_string());
    }

    /// Make all enumeration calls fail with a transport error
    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    /// Every mutation applied so far, in call order
    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    fn check_denied(&self, name_or_id: &str, what: &str) -> SpaceApiResult<()> {
        if self.denied.lock().unwrap().contains(name_or_id) {
            return Err(SpaceApiError::PermissionDenied(format!(
                "{} {}",
                what, name_or_id
            )));
        }
        Ok(())
    }

    fn check_reads(&self) -> SpaceApiResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(SpaceApiError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SpaceReader for MockSpaceHost {
    fn space_id(&self) -> SpaceId {
        self.id.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn owner_id(&self) -> UserId {
        self.owner_id.clone()
    }

    fn icon_ref(&self) -> Option<String> {
        self.icon_ref.clone()
    }

    fn banner_ref(&self) -> Option<String> {
        self.banner_ref.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }

    async fn roles(&self) -> SpaceApiResult<Vec<LiveRole>> {
        self.check_reads()?;
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn channels(&self) -> SpaceApiResult<Vec<LiveChannel>> {
        self.check_reads()?;
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn members(&self) -> SpaceApiResult<Vec<LiveMember>> {
        self.check_reads()?;
        Ok(self.members.lock().unwrap().clone())
    }
}

#[async_trait]
impl SpaceMutator for MockSpaceHost {
    async fn create_role(&self, role: &RoleSpec) -> SpaceApiResult<RoleId> {
        self.check_denied(&role.name, "create_role")?;

        let new_id = RoleId::new(self.next_id("role"));
        self.roles.lock().unwrap().push(LiveRole {
            id: new_id.0.clone(),
            name: role.name.clone(),
            color_value: role.color_value,
            permission_set: role.permission_set.clone(),
            hierarchy_position: role.hierarchy_position,
            is_hoisted: role.is_hoisted,
            is_mentionable: role.is_mentionable,
            is_managed: false,
            is_everyone: false,
        });
        self.mutations.lock().unwrap().push(Mutation::RoleCreated {
            name: role.name.clone(),
            new_id: new_id.clone(),
        });
        Ok(new_id)
    }

    async fn create_channel(&self, create: &ChannelCreate) -> SpaceApiResult<ChannelId> {
        self.check_denied(&create.name, "create_channel")?;

        let new_id = ChannelId::new(self.next_id("chan"));
        self.channels.lock().unwrap().push(LiveChannel {
            id: new_id.0.clone(),
            name: create.name.clone(),
            kind: create.kind,
            hierarchy_position: 0,
            parent_id: create.parent_id.as_ref().map(|p| p.0.clone()),
            topic: create.topic.clone(),
            is_adult_only: create.is_adult_only,
            slow_mode_seconds: create.slow_mode_seconds,
            bitrate: create.bitrate,
            user_limit: create.user_limit,
            overwrites: Vec::new(),
        });
        self.mutations
            .lock()
            .unwrap()
            .push(Mutation::ChannelCreated {
                name: create.name.clone(),
                kind: create.kind,
                parent_id: create.parent_id.clone(),
                new_id: new_id.clone(),
            });
        Ok(new_id)
    }

    async fn create_overwrite(
        &self,
        channel: &ChannelId,
        overwrite: &Overwrite,
    ) -> SpaceApiResult<()> {
        let mut channels = self.channels.lock().unwrap();
        let entry = channels
            .iter_mut()
            .find(|c| c.id == channel.0)
            .ok_or_else(|| SpaceApiError::NotFound(format!("channel {}", channel)))?;
        entry.overwrites.push(overwrite.clone());

        self.mutations
            .lock()
            .unwrap()
            .push(Mutation::OverwriteCreated {
                channel_id: channel.clone(),
                target_id: overwrite.target_id.clone(),
                target_kind: overwrite.target_kind,
            });
        Ok(())
    }

    async fn add_member_with_grant(
        &self,
        member: &UserId,
        _access_token: &str,
    ) -> SpaceApiResult<()> {
        self.check_denied(member.as_str(), "add_member")?;

        self.members.lock().unwrap().push(LiveMember {
            id: member.clone(),
            username: member.0.clone(),
            display_name: member.0.clone(),
            joined_at: super::types::Timestamp::now(),
            role_refs: Vec::new(),
            permission_set: Vec::new(),
            is_automated: false,
        });
        self.mutations.lock().unwrap().push(Mutation::MemberAdded {
            member_id: member.clone(),
        });
        Ok(())
    }

    async fn add_member_role(&self, member: &UserId, role: &RoleId) -> SpaceApiResult<()> {
        let mut members = self.members.lock().unwrap();
        let entry = members
            .iter_mut()
            .find(|m| &m.id == member)
            .ok_or_else(|| SpaceApiError::NotFound(format!("member {}", member)))?;
        entry.role_refs.push(role.0.clone());

        self.mutations
            .lock()
            .unwrap()
            .push(Mutation::MemberRoleGranted {
                member_id: member.clone(),
                role_id: role.clone(),
            });
        Ok(())
    }
}
