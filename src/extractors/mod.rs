//! Request extractors.

mod actor;

pub use actor::{CurrentActor, ACTOR_ROLE_HEADER, ACTOR_UUID_HEADER};
