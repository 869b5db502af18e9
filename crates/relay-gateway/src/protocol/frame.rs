//! Event frame format

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named event with an arbitrary JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event name (e.g. `join`, `message`, `room`)
    pub event: String,

    /// Event payload; `null` when the sender omitted it
    #[serde(default)]
    pub data: Value,
}

impl EventFrame {
    /// Create a frame
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_frame() {
        let frame = EventFrame::from_json(r#"{"event":"join","data":{"roomId":5}}"#).unwrap();
        assert_eq!(frame.event, "join");
        assert_eq!(frame.data["roomId"], 5);
    }

    #[test]
    fn test_missing_data_is_null() {
        let frame = EventFrame::from_json(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(frame.data, Value::Null);
    }

    #[test]
    fn test_rejects_non_frames() {
        assert!(EventFrame::from_json("not json").is_err());
        assert!(EventFrame::from_json(r#"{"data":{}}"#).is_err());
        assert!(EventFrame::from_json(r#""join""#).is_err());
    }

    #[test]
    fn test_serialize_frame() {
        let frame = EventFrame::new("room", json!({ "room": { "id": 1 } }));
        let json = frame.to_json().unwrap();
        assert_eq!(json, r#"{"event":"room","data":{"room":{"id":1}}}"#);
    }
}
