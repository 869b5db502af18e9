//! Redis connection pool module.
//!
//! Provides the pooled connections used by the publisher.

mod redis_pool;

pub use redis_pool::{connection_info, RedisPool, RedisPoolConfig};
