//! Redis publisher.
//!
//! Publishes payloads on Redis channels for every gateway process to receive.

use crate::error::{BroadcastError, BroadcastResult};
use crate::pool::{RedisPool, RedisPoolConfig};
use crate::topics::Topic;
use crate::traits::BroadcastPublisher;
use async_trait::async_trait;
use redis::AsyncCommands;

/// Redis publisher backed by a connection pool
#[derive(Debug, Clone)]
pub struct RedisPublisher {
    pool: RedisPool,
}

impl RedisPublisher {
    /// Create a publisher over an existing pool
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Create a pool and verify the server answers within the connect timeout
    pub async fn connect(config: &RedisPoolConfig) -> BroadcastResult<Self> {
        let pool = RedisPool::new(config)?;
        let timeout_ms = config.connect_timeout.as_millis() as u64;

        tokio::time::timeout(config.connect_timeout, pool.health_check())
            .await
            .map_err(|_| BroadcastError::ConnectTimeout(timeout_ms))??;

        tracing::info!("Publisher connected to Redis");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BroadcastPublisher for RedisPublisher {
    async fn publish(&self, topic: &Topic, payload: &str) -> BroadcastResult<u32> {
        let mut conn = self.pool.get().await?;
        let topic_name = topic.name();

        let receivers: u32 = conn.publish(&topic_name, payload).await?;

        tracing::debug!(
            topic = %topic_name,
            receivers = receivers,
            "Published payload"
        );

        Ok(receivers)
    }
}
