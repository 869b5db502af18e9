//! Redis-backed broadcast medium.
//!
//! The publisher draws from a connection pool; the subscriber owns one
//! dedicated pub/sub connection.

mod publisher;
mod subscriber;

pub use publisher::RedisPublisher;
pub use subscriber::{RedisSubscriber, SubscriberConfig};
