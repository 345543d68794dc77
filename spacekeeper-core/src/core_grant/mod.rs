//! Delegated-access grants: the record model, write path, and the
//! fixed-priority lookup cascade used during restoration

pub mod model;
pub mod registry;
pub mod resolver;

pub use model::{DelegationGrant, TokenResponse};
pub use registry::GrantRegistry;
pub use resolver::{GrantLookup, GrantResolver};
