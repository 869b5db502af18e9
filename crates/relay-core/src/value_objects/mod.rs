//! Value objects - typed identifiers

mod ids;

pub use ids::{MessageId, RoomId, UserId};
