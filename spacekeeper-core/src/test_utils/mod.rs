//! Shared test helpers

pub mod fixtures;

pub use fixtures::{test_grant, TestSnapshotBuilder};
