//! Envelope published on the `chat_messages` topic

use relay_core::{PublicMessage, RoomId};
use serde::{Deserialize, Deserializer, Serialize};

/// A converted chat message travelling between gateway processes
///
/// Wire shape: `{ "roomId": 5, "chatModel": {...}, "sourceOrigin": "3001-ab12cd34" }`.
/// Older publishers send the origin as `sourcePort`, as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub room_id: RoomId,
    pub chat_model: PublicMessage,
    #[serde(
        default,
        alias = "sourcePort",
        deserialize_with = "string_or_number"
    )]
    pub source_origin: String,
}

impl MessageEnvelope {
    /// Create an envelope stamped with the publishing process's origin
    pub fn new(room_id: RoomId, chat_model: PublicMessage, source_origin: impl Into<String>) -> Self {
        Self {
            room_id,
            chat_model,
            source_origin: source_origin.into(),
        }
    }

    /// Parse from a channel payload
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Serialize to a channel payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}
