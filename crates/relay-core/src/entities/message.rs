//! Message entities - the persisted record and its public projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::value_objects::{MessageId, RoomId, UserId};

/// Persisted chat message as returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// Create a new MessageRecord stamped with the current time
    pub fn new(id: MessageId, room_id: RoomId, user_id: UserId, content: String) -> Self {
        Self {
            id,
            room_id,
            user_id,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Sender information embedded in a public message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: UserId,
    pub name: String,
}

impl From<User> for MessageSender {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

/// Externally-safe projection of a persisted message
///
/// This is the `chatModel` carried on the broadcast channel and the `chat`
/// field of the outbound `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub content: String,
    pub sender: MessageSender,
    pub created_at: DateTime<Utc>,
}

impl PublicMessage {
    /// Project a record together with its resolved sender
    pub fn from_record(record: &MessageRecord, sender: MessageSender) -> Self {
        Self {
            id: record.id,
            room_id: record.room_id,
            content: record.content.clone(),
            sender,
            created_at: record.created_at,
        }
    }
}
