//! PostgreSQL implementation of ChatStore

mod error;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use relay_core::{
    ChatStore, MessageRecord, MessageSender, PublicMessage, Room, RoomId, StoreError, StoreResult,
    User, UserId,
};

use crate::models::{ChatModel, RoomModel, UserModel};
use crate::validation::NewMessage;

use error::{map_db_error, map_insert_error};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS rooms (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS chats (
        id BIGSERIAL PRIMARY KEY,
        room_id BIGINT NOT NULL CONSTRAINT chats_room_id_fkey REFERENCES rooms(id),
        user_id BIGINT NOT NULL CONSTRAINT chats_user_id_fkey REFERENCES users(id),
        content TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// PostgreSQL implementation of ChatStore
#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Create a new PgChatStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the rooms, users, and chats tables if they are missing
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;
        }

        tracing::info!("Chat schema ready");
        Ok(())
    }

    /// Insert a room, returning it with its generated id
    #[instrument(skip(self))]
    pub async fn create_room(&self, name: &str) -> StoreResult<Room> {
        let model = sqlx::query_as::<_, RoomModel>(
            r#"
            INSERT INTO rooms (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Room::from(model))
    }

    /// Insert a user, returning it with its generated id
    #[instrument(skip(self))]
    pub async fn create_user(&self, name: &str) -> StoreResult<User> {
        let model = sqlx::query_as::<_, UserModel>(
            r#"
            INSERT INTO users (name)
            VALUES ($1)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(User::from(model))
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    #[instrument(skip(self))]
    async fn get_room(&self, room_id: RoomId) -> StoreResult<Room> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT id, name, created_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result
            .map(Room::from)
            .ok_or(StoreError::RoomNotFound(room_id))
    }

    #[instrument(skip(self, message))]
    async fn create_chat(
        &self,
        user_id: UserId,
        room_id: RoomId,
        message: &str,
    ) -> StoreResult<MessageRecord> {
        let new_message = NewMessage::parse(message)?;

        let model = sqlx::query_as::<_, ChatModel>(
            r#"
            INSERT INTO chats (room_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, room_id, user_id, content, created_at
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .bind(&new_message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, user_id, room_id))?;

        Ok(MessageRecord::from(model))
    }

    #[instrument(skip(self, record), fields(message_id = %record.id))]
    async fn convert_chat_model(&self, record: &MessageRecord) -> StoreResult<PublicMessage> {
        let user = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(record.user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or(StoreError::UserNotFound(record.user_id))?;

        Ok(PublicMessage::from_record(
            record,
            MessageSender::from(User::from(user)),
        ))
    }
}
