//! # relay-store
//!
//! Implementations of the [`relay_core::ChatStore`] contract.
//!
//! - [`MemoryChatStore`]: seeded, process-local store for development and tests
//! - [`PgChatStore`]: PostgreSQL store via SQLx, used when `DATABASE_URL` is set
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_store::pool::{create_pool, DatabaseConfig};
//! use relay_store::PgChatStore;
//!
//! let pool = create_pool(&DatabaseConfig::from(&app_config.database)).await?;
//! let store = PgChatStore::new(pool);
//! store.ensure_schema().await?;
//! ```

pub mod memory;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod validation;

pub use memory::MemoryChatStore;
pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use postgres::PgChatStore;
pub use validation::{NewMessage, MAX_MESSAGE_LENGTH};
