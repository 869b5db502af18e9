//! Broadcast medium selection

use relay_broadcast::{
    BroadcastResult, MemoryBroadcast, RedisPoolConfig, RedisPublisher, RedisSubscriber,
    SharedPublisher, SharedSubscriber, SubscriberConfig,
};
use relay_common::RedisConfig;
use std::sync::Arc;

/// Where the gateway's publisher and subscriber handles come from
#[derive(Debug, Clone)]
pub enum BroadcastMedium {
    /// Redis pub/sub: a pooled publisher plus a dedicated subscriber connection
    Redis(RedisConfig),
    /// In-process bus, shared by every gateway holding a clone
    Memory(MemoryBroadcast),
}

impl BroadcastMedium {
    /// Open the publisher and subscriber handles
    ///
    /// For Redis both connections must come up within the configured connect
    /// timeout.
    pub async fn connect(&self) -> BroadcastResult<(SharedPublisher, SharedSubscriber)> {
        match self {
            Self::Redis(config) => {
                tracing::info!(url = %config.redacted_url(), "Connecting to Redis...");

                let pool_config = RedisPoolConfig::from(config);
                let (publisher, subscriber) = tokio::try_join!(
                    RedisPublisher::connect(&pool_config),
                    RedisSubscriber::connect(SubscriberConfig::from(config)),
                )?;

                let publisher: SharedPublisher = Arc::new(publisher);
                let subscriber: SharedSubscriber = Arc::new(subscriber);
                Ok((publisher, subscriber))
            }
            Self::Memory(bus) => {
                let publisher: SharedPublisher = Arc::new(bus.clone());
                let subscriber: SharedSubscriber = Arc::new(bus.clone());
                Ok((publisher, subscriber))
            }
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}
