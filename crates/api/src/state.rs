//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::feed::{FeedError, feed_client};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    feed_client: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, FeedError> {
        let feed_client = feed_client(&config.feed)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                feed_client,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// HTTP client for downloading seller feeds.
    #[must_use]
    pub fn feed_client(&self) -> &reqwest::Client {
        &self.inner.feed_client
    }
}
