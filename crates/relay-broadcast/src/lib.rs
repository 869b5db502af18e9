//! # relay-broadcast
//!
//! The broadcast channel every gateway process uses to learn about messages
//! created on any other process.
//!
//! ## Features
//!
//! - **Capabilities**: publishing and subscribing are two separate traits,
//!   [`BroadcastPublisher`] and [`BroadcastSubscriber`]
//! - **Redis**: pooled publisher plus a dedicated, self-reconnecting
//!   subscriber connection
//! - **Memory**: a single-process medium that backs both capabilities, used
//!   for local development and tests
//!
//! ## Example
//!
//! ```ignore
//! use relay_broadcast::{RedisPublisher, RedisSubscriber, SubscriberConfig, Topic};
//!
//! let publisher = RedisPublisher::connect(&pool_config).await?;
//! let subscriber = RedisSubscriber::connect(SubscriberConfig::from(&redis_config)).await?;
//!
//! let mut subscription = subscriber.subscribe(&Topic::ChatMessages).await?;
//! publisher.publish(&Topic::ChatMessages, r#"{"roomId":1}"#).await?;
//!
//! while let Some(msg) = subscription.recv().await {
//!     println!("{}", msg.payload);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod pool;
pub mod redis_pubsub;
pub mod topics;
pub mod traits;

pub use error::{BroadcastError, BroadcastResult};
pub use memory::MemoryBroadcast;
pub use pool::{connection_info, RedisPool, RedisPoolConfig};
pub use redis_pubsub::{RedisPublisher, RedisSubscriber, SubscriberConfig};
pub use topics::{Topic, ADAPTER_TOPIC_PREFIX, CHAT_MESSAGES_TOPIC};
pub use traits::{
    publish_json, BroadcastPublisher, BroadcastSubscriber, ReceivedMessage, SharedPublisher,
    SharedSubscriber, Subscription,
};
