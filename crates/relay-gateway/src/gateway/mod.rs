//! Chat gateway
//!
//! Join and send handling plus the `chat_messages` subscriber loop.

mod chat_gateway;
mod error;
mod medium;

pub use chat_gateway::ChatGateway;
pub use error::{GatewayError, GatewayResult};
pub use medium::BroadcastMedium;
