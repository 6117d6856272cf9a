//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 8000)
//! - `BAZAAR_FEED_TIMEOUT_SECS` - Seller feed download timeout (default: 30)
//! - `BAZAAR_FEED_MAX_BYTES` - Largest accepted seller feed (default: 10 MiB)
//! - `BAZAAR_CATEGORY_NAME_POLICY` - `preserve`, `update` or `reject` (default: preserve)
//! - `BAZAAR_PAGE_SIZE` - Default page size for listings (default: 20)
//! - `BAZAAR_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use bazaar_core::CategoryNamePolicy;
use secrecy::SecretString;
use thiserror::Error;

/// Largest page a client may request, whatever the configured default.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Seller feed ingestion settings
    pub feed: FeedConfig,
    /// Default page size for list endpoints
    pub page_size: u32,
    /// Emit JSON logs instead of human-readable text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Settings for downloading and reconciling seller feeds.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    /// Total time allowed for a feed download.
    pub timeout: Duration,
    /// Largest feed body accepted, in bytes.
    pub max_bytes: usize,
    /// How to treat a known category ID that arrives under a new name.
    pub category_name_policy: CategoryNamePolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            category_name_policy: CategoryNamePolicy::Preserve,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BAZAAR_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("BAZAAR_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("BAZAAR_PORT", "8000")?;

        let page_size = parse_env_or_default::<u32>("BAZAAR_PAGE_SIZE", "20")?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let json_logs = get_optional_env("BAZAAR_LOG_FORMAT")
            .is_some_and(|format| format.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            host,
            port,
            feed: FeedConfig::from_env()?,
            page_size,
            json_logs,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FeedConfig {
    /// Load feed settings on their own (used by the CLI import command).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env_or_default::<u64>("BAZAAR_FEED_TIMEOUT_SECS", "30")?;
        let max_bytes = parse_env_or_default::<usize>("BAZAAR_FEED_MAX_BYTES", "10485760")?;
        let category_name_policy =
            parse_env_or_default::<CategoryNamePolicy>("BAZAAR_CATEGORY_NAME_POLICY", "preserve")?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_FEED_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            max_bytes,
            category_name_policy,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
