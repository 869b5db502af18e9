//! Broadcast topic definitions.
//!
//! Defines the topic naming conventions on the pub/sub medium.

/// Topic carrying chat message envelopes between gateway processes
pub const CHAT_MESSAGES_TOPIC: &str = "chat_messages";
/// Topic prefix for connection-layer adapter packets
pub const ADAPTER_TOPIC_PREFIX: &str = "relay#";

/// Broadcast topic types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Chat message envelopes published by the gateway
    ChatMessages,
    /// Transport-level broadcasts replicated by the adapter, per namespace
    Adapter(String),
    /// Custom topic name
    Custom(String),
}

impl Topic {
    /// Create the adapter topic for a namespace (e.g. `"/"`)
    #[must_use]
    pub fn adapter(namespace: impl Into<String>) -> Self {
        Self::Adapter(namespace.into())
    }

    /// Create a custom topic
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the topic name on the medium
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::ChatMessages => CHAT_MESSAGES_TOPIC.to_string(),
            Self::Adapter(namespace) => format!("{ADAPTER_TOPIC_PREFIX}{namespace}#"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a topic name back to a `Topic`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == CHAT_MESSAGES_TOPIC {
            return Self::ChatMessages;
        }

        if let Some(namespace) = name
            .strip_prefix(ADAPTER_TOPIC_PREFIX)
            .and_then(|rest| rest.strip_suffix('#'))
        {
            if !namespace.is_empty() {
                return Self::Adapter(namespace.to_string());
            }
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
