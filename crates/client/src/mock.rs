pub mod roster;

pub use crate::api::MockRosterApi;
pub use roster::InMemoryRoster;
