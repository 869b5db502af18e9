//! Client and server events

use relay_core::{PublicMessage, Room, RoomId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::EventFrame;

/// Client event names
pub const JOIN_EVENT: &str = "join";
pub const MESSAGE_EVENT: &str = "message";

/// Server event names
pub const ROOM_EVENT: &str = "room";
pub const ERROR_EVENT: &str = "error";

/// Payload of the inbound `join` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub room_id: RoomId,
}

/// Payload of the inbound `message` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub message: String,
}

/// A known event whose payload did not match its shape
#[derive(Debug, Error)]
#[error("Invalid {event} payload: {source}")]
pub struct PayloadError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

/// Event received from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Join(JoinPayload),
    Message(MessagePayload),
    /// Any other event name; ignored by the gateway
    Unknown(String),
}

impl ClientEvent {
    /// Interpret a frame received from a client
    pub fn parse(frame: EventFrame) -> Result<Self, PayloadError> {
        let EventFrame { event, data } = frame;

        match event.as_str() {
            JOIN_EVENT => serde_json::from_value(data)
                .map(Self::Join)
                .map_err(|source| PayloadError { event, source }),
            MESSAGE_EVENT => serde_json::from_value(data)
                .map(Self::Message)
                .map_err(|source| PayloadError { event, source }),
            _ => Ok(Self::Unknown(event)),
        }
    }
}

/// Payload of the outbound `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Client event that failed
    pub event: String,
    /// Stable error code (e.g. `UNKNOWN_ROOM`)
    pub code: String,
    pub message: String,
}

/// Event sent to a client
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Join acknowledged: `{ room }`
    Room(Room),
    /// Chat message relayed to a room member: `{ chat }`
    Message(PublicMessage),
    /// Join or send failed (only under the `emit` error policy)
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Build an error event
    pub fn error(
        event: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Error(ErrorPayload {
            event: event.into(),
            code: code.into(),
            message: message.into(),
        })
    }

    /// Event name on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Room(_) => ROOM_EVENT,
            Self::Message(_) => MESSAGE_EVENT,
            Self::Error(_) => ERROR_EVENT,
        }
    }

    /// Convert into a wire frame
    #[must_use]
    pub fn into_frame(self) -> EventFrame {
        let name = self.name();
        let data = match self {
            Self::Room(room) => wrap("room", &room),
            Self::Message(chat) => wrap("chat", &chat),
            Self::Error(payload) => serde_json::to_value(payload).unwrap_or_default(),
        };
        EventFrame::new(name, data)
    }
}

impl From<ServerEvent> for EventFrame {
    fn from(event: ServerEvent) -> Self {
        event.into_frame()
    }
}

/// `{ key: value }`
fn wrap<T: Serialize>(key: &str, value: &T) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(
        key.to_string(),
        serde_json::to_value(value).unwrap_or_default(),
    );
    Value::Object(map)
}
