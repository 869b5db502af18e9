//! # relay-core
//!
//! Domain layer containing rooms, chat messages, and the store contract the
//! gateway depends on. This crate has zero dependencies on infrastructure
//! (database, pub/sub medium, web framework).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{MessageRecord, MessageSender, PublicMessage, Room, User};
pub use error::{StoreError, StoreResult};
pub use traits::{ChatStore, SharedChatStore};
pub use value_objects::{MessageId, RoomId, UserId};
