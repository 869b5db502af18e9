//! Database models and their mapping onto domain entities

use chrono::{DateTime, Utc};
use relay_core::{MessageId, MessageRecord, Room, RoomId, User, UserId};
use sqlx::FromRow;

/// Database model for the rooms table
#[derive(Debug, Clone, FromRow)]
pub struct RoomModel {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Database model for the users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub name: String,
}

/// Database model for the chats table
#[derive(Debug, Clone, FromRow)]
pub struct ChatModel {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<RoomModel> for Room {
    fn from(model: RoomModel) -> Self {
        Room {
            id: RoomId::new(model.id),
            name: model.name,
            created_at: model.created_at,
        }
    }
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User::new(UserId::new(model.id), model.name)
    }
}

impl From<ChatModel> for MessageRecord {
    fn from(model: ChatModel) -> Self {
        MessageRecord {
            id: MessageId::new(model.id),
            room_id: RoomId::new(model.room_id),
            user_id: UserId::new(model.user_id),
            content: model.content,
            created_at: model.created_at,
        }
    }
}
