//! In-memory chat store
//!
//! Holds rooms, users, and messages in process memory. The default seed is
//! enough to run the gateway locally without a database.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use relay_core::{
    ChatStore, MessageId, MessageRecord, MessageSender, PublicMessage, Room, RoomId, StoreError,
    StoreResult, User, UserId,
};

use crate::validation::NewMessage;

/// Process-local [`ChatStore`]
#[derive(Debug)]
pub struct MemoryChatStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
    users: RwLock<HashMap<UserId, User>>,
    messages: RwLock<Vec<MessageRecord>>,
    next_message_id: AtomicI64,
}

impl Default for MemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Create a store with a couple of rooms and users for local use
    pub fn seeded() -> Self {
        Self::new()
            .with_room(RoomId::new(1), "General")
            .with_room(RoomId::new(2), "Random")
            .with_user(UserId::new(1), "alice")
            .with_user(UserId::new(2), "bob")
    }

    /// Add a room
    pub fn with_room(self, id: RoomId, name: impl Into<String>) -> Self {
        self.rooms.write().insert(id, Room::new(id, name));
        self
    }

    /// Add a user
    pub fn with_user(self, id: UserId, name: impl Into<String>) -> Self {
        self.users.write().insert(id, User::new(id, name));
        self
    }

    /// Every stored message, oldest first
    pub fn messages(&self) -> Vec<MessageRecord> {
        self.messages.read().clone()
    }

    /// Stored messages for one room, oldest first
    pub fn messages_in(&self, room_id: RoomId) -> Vec<MessageRecord> {
        self.messages
            .read()
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room> {
        self.rooms
            .read()
            .get(&room_id)
            .cloned()
            .ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn create_chat(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message: &str,
    ) -> StoreResult<MessageRecord> {
        let new_message = NewMessage::parse(message)?;

        if !self.rooms.read().contains_key(&room_id) {
            return Err(StoreError::RoomNotFound(room_id));
        }
        if !self.users.read().contains_key(&user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }

        let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::Relaxed));
        let record = MessageRecord::new(id, room_id, user_id, new_message.content);
        self.messages.write().push(record.clone());

        tracing::debug!(message_id = %id, room_id = %room_id, "Chat stored in memory");

        Ok(record)
    }

    async fn convert_chat_model(&self, record: &MessageRecord) -> StoreResult<PublicMessage> {
        let user = self
            .users
            .read()
            .get(&record.user_id)
            .cloned()
            .ok_or(StoreError::UserNotFound(record.user_id))?;

        Ok(PublicMessage::from_record(record, MessageSender::from(user)))
    }
}
