//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). Every setting has a default suitable for local development.

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub redis: RedisConfig,
    pub database: Option<DatabaseConfig>,
    pub relay: RelayConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Listener configuration for the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Broadcast medium (Redis) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl RedisConfig {
    /// URL with any credentials stripped, for logging
    #[must_use]
    pub fn redacted_url(&self) -> &str {
        self.url.split('@').next_back().unwrap_or(&self.url)
    }
}

/// Database configuration (optional; absent means in-memory store)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// What the gateway does when a join or send fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log only; the client observes silence
    #[default]
    Silent,
    /// Log and emit an `error` event to the requesting connection
    Emit,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" => Ok(Self::Silent),
            "emit" => Ok(Self::Emit),
            other => Err(format!("unknown error policy '{other}'")),
        }
    }
}

/// Cross-process relay settings
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Identifier stamped on every envelope this process publishes
    pub instance_id: String,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
    #[serde(default = "default_adapter_enabled")]
    pub adapter_enabled: bool,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "chat-relay".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_connect_timeout_ms() -> u64 {
    60_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_adapter_enabled() -> bool {
    true
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_instance_id(port: u16) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{port}-{}", &suffix[..8])
}

/// Look up the first variable that is set and non-empty
fn first_of<F>(lookup: &F, keys: &[&'static str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
}

/// Parse a variable, falling back to a default when unset
fn parse_or<F, T>(lookup: &F, keys: &[&'static str], default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    for &key in keys {
        if let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) {
            return raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw));
        }
    }
    Ok(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, &["PORT", "GATEWAY_PORT"], default_port())?;

        let database = first_of(&lookup, &["DATABASE_URL"])
            .map(|url| -> Result<DatabaseConfig, ConfigError> {
                Ok(DatabaseConfig {
                    url,
                    max_connections: parse_or(
                        &lookup,
                        &["DATABASE_MAX_CONNECTIONS"],
                        default_max_connections(),
                    )?,
                    min_connections: parse_or(
                        &lookup,
                        &["DATABASE_MIN_CONNECTIONS"],
                        default_min_connections(),
                    )?,
                })
            })
            .transpose()?;

        Ok(Self {
            app: AppSettings {
                name: first_of(&lookup, &["APP_NAME"]).unwrap_or_else(default_app_name),
                env: parse_or(&lookup, &["APP_ENV"], Environment::default())?,
            },
            gateway: ServerConfig {
                host: first_of(&lookup, &["GATEWAY_HOST"]).unwrap_or_else(default_host),
                port,
            },
            redis: RedisConfig {
                url: first_of(&lookup, &["REDIS_URL", "REDIS_HOST"])
                    .unwrap_or_else(default_redis_url),
                password: first_of(&lookup, &["REDIS_PASSWORD", "REDIS_PW"]),
                max_connections: parse_or(
                    &lookup,
                    &["REDIS_MAX_CONNECTIONS"],
                    default_redis_max_connections(),
                )?,
                connect_timeout_ms: parse_or(
                    &lookup,
                    &["REDIS_CONNECT_TIMEOUT_MS"],
                    default_connect_timeout_ms(),
                )?,
                reconnect_delay_ms: parse_or(
                    &lookup,
                    &["REDIS_RECONNECT_DELAY_MS"],
                    default_reconnect_delay_ms(),
                )?,
            },
            database,
            relay: RelayConfig {
                instance_id: first_of(&lookup, &["INSTANCE_ID"])
                    .unwrap_or_else(|| default_instance_id(port)),
                error_policy: parse_or(&lookup, &["GATEWAY_ERROR_POLICY"], ErrorPolicy::default())?,
                adapter_enabled: parse_or(
                    &lookup,
                    &["RELAY_ADAPTER_ENABLED"],
                    default_adapter_enabled(),
                )?,
                outbound_buffer: parse_or(
                    &lookup,
                    &["GATEWAY_OUTBOUND_BUFFER"],
                    default_outbound_buffer(),
                )?,
            },
            cors: CorsConfig {
                allowed_origins: first_of(&lookup, &["CORS_ALLOWED_ORIGINS"])
                    .map(|s| {
                        s.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
