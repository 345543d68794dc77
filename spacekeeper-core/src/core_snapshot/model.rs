/*
    model.rs - Snapshot document model

    A SpaceSnapshot is an immutable point-in-time capture of a space's
    structure and membership. One snapshot exists per source space,
    addressed by the source space id and queried by owner; a new capture
    writes a whole new document rather than mutating the old one.

    Role and channel ids inside a snapshot are source-space identifiers.
    They exist so a restore can remap references (overwrite targets,
    channel parents, member role refs) onto the ids minted by the
    destination space; they are never reused as identifiers there.
*/

use crate::core_space::types::{SpaceId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named permission flags, as the remote API reports them
pub type PermissionSet = Vec<String>;

/// Channel shape, collapsed to the kinds the restore path distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Grouping container for other channels
    Category,
    /// Text channel
    Text,
    /// Voice channel
    Voice,
    /// Anything else the remote API may grow
    Other,
}

impl Default for ChannelKind {
    fn default() -> Self {
        ChannelKind::Text
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChannelKind::Category => "category",
            ChannelKind::Text => "text",
            ChannelKind::Voice => "voice",
            ChannelKind::Other => "other",
        };
        write!(f, "{}", label)
    }
}

/// What a permission overwrite is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteTargetKind {
    Role,
    Member,
}

/// Per-channel permission exception bound to a role or member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overwrite {
    /// Source-space role id, or member id (member ids survive restores)
    pub target_id: String,
    pub target_kind: OverwriteTargetKind,
    pub allow_set: PermissionSet,
    pub deny_set: PermissionSet,
}

/// Captured role definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Source-space role id
    pub id: String,
    pub name: String,
    pub color_value: u32,
    pub permission_set: PermissionSet,
    /// Lower positions are created first during a restore, so higher
    /// positions end up with higher effective rank
    pub hierarchy_position: i64,
    pub is_hoisted: bool,
    pub is_mentionable: bool,
}

/// Captured channel definition with its permission overwrites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Source-space channel id
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    pub hierarchy_position: i64,
    /// Source-space id of the parent category, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_adult_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_mode_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u16>,
    #[serde(default)]
    pub overwrites: Vec<Overwrite>,
}

/// Captured member with the role references to re-grant after re-admission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub joined_at: Timestamp,
    /// Source-space role ids held at capture time
    pub role_refs: Vec<String>,
    pub permission_set_at_capture: PermissionSet,
}

/// Immutable capture of a space's structure and membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub owner_id: UserId,
    pub source_space_id: SpaceId,
    pub source_space_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered by hierarchy_position ascending
    pub roles: Vec<RoleSpec>,
    pub channels: Vec<ChannelSpec>,
    pub members: Vec<MemberSnapshot>,
    pub captured_at: Timestamp,
    pub member_count: usize,
}

impl SpaceSnapshot {
    /// Roles in the order a restore must create them (position ascending)
    pub fn roles_in_creation_order(&self) -> Vec<&RoleSpec> {
        let mut roles: Vec<&RoleSpec> = self.roles.iter().collect();
        roles.sort_by_key(|r| r.hierarchy_position);
        roles
    }

    /// Category channels in position order; created before everything else
    pub fn categories(&self) -> Vec<&ChannelSpec> {
        let mut categories: Vec<&ChannelSpec> = self
            .channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Category)
            .collect();
        categories.sort_by_key(|c| c.hierarchy_position);
        categories
    }

    /// Non-category channels in position order
    pub fn non_category_channels(&self) -> Vec<&ChannelSpec> {
        let mut channels: Vec<&ChannelSpec> = self
            .channels
            .iter()
            .filter(|c| c.kind != ChannelKind::Category)
            .collect();
        channels.sort_by_key(|c| c.hierarchy_position);
        channels
    }
}
