//! Gateway error types

use crate::protocol::PayloadError;
use relay_broadcast::BroadcastError;
use relay_common::AppError;
use relay_core::StoreError;
use thiserror::Error;

/// Failure while handling a client request or starting the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Store rejected or failed the request
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Broadcast channel failed (connect, subscribe, or publish)
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// Known event with a malformed payload
    #[error(transparent)]
    InvalidPayload(#[from] PayloadError),
}

impl GatewayError {
    /// Stable error code for `error` events and logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.code(),
            Self::Broadcast(_) => "BROADCAST_ERROR",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Broadcast(e) => Self::Broadcast(e.to_string()),
            GatewayError::Store(e) => Self::Database(e.to_string()),
            GatewayError::InvalidPayload(e) => Self::internal(e),
        }
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
