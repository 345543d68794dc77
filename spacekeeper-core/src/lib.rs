//! SpaceKeeper core: community-structure snapshot and restoration engine
//!
//! Captures the mutable state of a collaborative space (membership, role
//! hierarchy, channel topology, permission overwrites) into an immutable
//! snapshot document, and reconstructs an equivalent space from the
//! owner's most recent snapshot, re-admitting members through previously
//! recorded delegated-access grants.
//!
//! The host process supplies the two collaborators this crate talks to:
//! a [`core_store::DocumentStore`] for snapshots and grants, and a live
//! space behind [`core_space::SpaceReader`] / [`core_space::SpaceMutator`].

pub mod config;
pub mod core_grant;
pub mod core_restore;
pub mod core_snapshot;
pub mod core_space;
pub mod core_store;
pub mod logging;
pub mod test_utils;

pub use config::Config;
pub use core_grant::{DelegationGrant, GrantLookup, GrantRegistry, GrantResolver, TokenResponse};
pub use core_restore::{Pacer, RestoreOutcome, RestoreReport, Restorer};
pub use core_snapshot::{SpaceSnapshot, Snapshotter};
pub use core_space::{SpaceMutator, SpaceReader};
pub use core_store::{DocumentStore, MemoryStore};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = Config::default();
    }
}
