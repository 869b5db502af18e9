//! Redis connection pool using deadpool-redis.

use crate::error::{BroadcastError, BroadcastResult};
use deadpool_redis::{Config, Pool, Runtime};
use redis::{ConnectionInfo, IntoConnectionInfo};
use std::time::Duration;

/// Parse a Redis URL and apply a separately configured password
///
/// The password is set on the parsed connection info, so reserved URL
/// characters need no escaping. A non-empty password replaces one embedded
/// in the URL.
pub fn connection_info(url: &str, password: Option<&str>) -> BroadcastResult<ConnectionInfo> {
    let mut info = url.into_connection_info()?;
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        info.redis.password = Some(password.to_string());
    }
    Ok(info)
}

/// Redis pool configuration
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Password applied on top of the URL
    pub password: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
    /// How long to wait for the first connection
    pub connect_timeout: Duration,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            password: None,
            max_connections: 16,
            connect_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&relay_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &relay_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            password: config.password.clone(),
            max_connections: config.max_connections as usize,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }
}

/// Managed Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    /// Create a new Redis pool with the given configuration
    ///
    /// Connections are opened lazily; call [`RedisPool::health_check`] to
    /// find out whether the server is reachable.
    pub fn new(config: &RedisPoolConfig) -> BroadcastResult<Self> {
        let info = connection_info(&config.url, config.password.as_deref())?;
        let cfg = Config::from_connection_info(info);
        let pool = cfg
            .builder()
            .map_err(|e| BroadcastError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| BroadcastError::CreatePool(e.to_string()))?;

        // Redact credentials from URL for logging
        let safe_url = config.url.split('@').next_back().unwrap_or(&config.url);
        tracing::info!(
            url = %safe_url,
            max_connections = config.max_connections,
            "Redis pool created"
        );

        Ok(Self { pool })
    }

    /// Get a connection from the pool
    pub async fn get(&self) -> BroadcastResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(BroadcastError::GetConnection)
    }

    /// Get the current pool status
    #[must_use]
    pub fn status(&self) -> deadpool_redis::Status {
        self.pool.status()
    }

    /// Check if the pool is healthy by pinging Redis
    pub async fn health_check(&self) -> BroadcastResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
