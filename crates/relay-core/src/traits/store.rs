//! Chat store trait (port) - the room/message collaborator used by the gateway
//!
//! The gateway never touches persistence directly. Room lookup, message
//! creation, and the public projection all go through this trait so the
//! backing store can be swapped without touching connection handling.

use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{MessageRecord, PublicMessage, Room};
use crate::error::StoreResult;
use crate::value_objects::{RoomId, UserId};

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Fetch a room, failing with `RoomNotFound` if it does not exist
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room>;

    /// Persist a new message in a room
    async fn create_chat(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message: &str,
    ) -> StoreResult<MessageRecord>;

    /// Project a persisted record into its public model
    async fn convert_chat_model(&self, record: &MessageRecord) -> StoreResult<PublicMessage>;
}

/// Store shared across handlers
pub type SharedChatStore = Arc<dyn ChatStore>;
