//! Snapshot document model and the capture path

pub mod model;
pub mod snapshotter;

pub use model::{
    ChannelKind, ChannelSpec, MemberSnapshot, Overwrite, OverwriteTargetKind, PermissionSet,
    RoleSpec, SpaceSnapshot,
};
pub use snapshotter::{SnapshotError, SnapshotResult, Snapshotter};
