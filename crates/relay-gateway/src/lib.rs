//! # relay-gateway
//!
//! WebSocket gateway that relays chat room messages between processes.
//!
//! Clients `join` rooms and send `message` events. Each message is persisted,
//! published once on the `chat_messages` topic, and delivered by every
//! gateway process (the sender's included) to its own room members.

pub mod adapter;
pub mod connection;
pub mod envelope;
pub mod gateway;
pub mod protocol;
pub mod server;

pub use adapter::{AdapterPacket, ClusterAdapter};
pub use connection::{room_group, Connection, ConnectionRegistry};
pub use envelope::MessageEnvelope;
pub use gateway::{BroadcastMedium, ChatGateway, GatewayError, GatewayResult};
pub use server::{create_app, create_gateway_state, run, serve, shutdown_signal, GatewayState};
