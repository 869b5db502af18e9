//! Error handling utilities for the PostgreSQL store

use relay_core::{RoomId, StoreError, UserId};
use sqlx::Error as SqlxError;

/// Convert SQLx error to StoreError
pub fn map_db_error(e: SqlxError) -> StoreError {
    StoreError::DatabaseError(e.to_string())
}

/// Map a failed chat insert, turning foreign key violations into not-found errors
pub fn map_insert_error(e: SqlxError, user_id: UserId, room_id: RoomId) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return match db_err.constraint() {
                Some("chats_user_id_fkey") => StoreError::UserNotFound(user_id),
                _ => StoreError::RoomNotFound(room_id),
            };
        }
    }
    map_db_error(e)
}
