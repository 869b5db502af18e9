//! Integration test utilities for the chat relay
//!
//! Boots gateway nodes on ephemeral ports that share one in-memory broadcast
//! medium and drives them with real WebSocket clients.

pub mod helpers;

pub use helpers::*;
