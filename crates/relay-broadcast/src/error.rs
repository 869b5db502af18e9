//! Broadcast channel errors.

/// Error type for broadcast channel operations
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out connecting to broadcast medium after {0} ms")]
    ConnectTimeout(u64),

    #[error("Channel closed")]
    ChannelClosed,
}

impl BroadcastError {
    /// Whether the medium could not be reached at all
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Redis(e) => e.is_connection_refusal() || e.is_io_error() || e.is_timeout(),
            Self::CreatePool(_) | Self::GetConnection(_) | Self::ConnectTimeout(_) => true,
            Self::Serialization(_) | Self::ChannelClosed => false,
        }
    }
}

/// Result type for broadcast channel operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;
