//! Live group-space seam: id primitives, API traits, and the test mock

pub mod host;
pub mod mock_host;
pub mod types;

pub use host::{
    ChannelCreate, LiveChannel, LiveMember, LiveRole, SpaceApiError, SpaceApiResult, SpaceMutator,
    SpaceReader,
};
pub use mock_host::{MockSpaceHost, Mutation};
pub use types::{ChannelId, RoleId, SpaceId, Timestamp, UserId};
