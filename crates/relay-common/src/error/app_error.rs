//! Application error types
//!
//! Errors that abort process startup or the server loop. Per-message
//! failures never surface here; the gateway absorbs them.

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Broadcast medium errors
    #[error("Broadcast channel error: {0}")]
    Broadcast(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Listener errors
    #[error("Server error: {0}")]
    Server(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Broadcast(_) => "BROADCAST_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error happened before the listener was bound
    #[must_use]
    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Broadcast(_) | Self::Database(_))
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
