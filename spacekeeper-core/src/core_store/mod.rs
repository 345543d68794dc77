//! Document store client: the seam in front of the Grant Store collaborator

pub mod client;
pub mod errors;
pub mod memory;

pub use client::{from_document, to_document, DocumentStore, QueryOp};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
