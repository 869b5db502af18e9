//! Connection management
//!
//! Tracks WebSocket connections and their room memberships on this process.

mod connection;
mod registry;

pub use connection::Connection;
pub use registry::{room_group, ConnectionRegistry, ROOM_GROUP_PREFIX};
