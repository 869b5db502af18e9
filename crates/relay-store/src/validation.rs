//! Content validation shared by every store

use relay_core::StoreError;
use validator::Validate;

/// Longest accepted message, in characters
pub const MAX_MESSAGE_LENGTH: u64 = 2000;

/// Message content about to be persisted
#[derive(Debug, Clone, Validate)]
pub struct NewMessage {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub content: String,
}

impl NewMessage {
    /// Validate raw content, rejecting empty, blank, or oversized text
    pub fn parse(content: &str) -> Result<Self, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::ValidationError(
                "Message must not be blank".to_string(),
            ));
        }

        let message = Self {
            content: content.to_string(),
        };
        message
            .validate()
            .map_err(|e| StoreError::ValidationError(e.to_string()))?;

        Ok(message)
    }
}
