//! Seller catalog feeds.
//!
//! A feed is a YAML document published by a seller at a URL of their choice:
//!
//! ```yaml
//! shop: Связной
//! categories:
//!   - id: 224
//!     name: Смартфоны
//! goods:
//!   - id: 4216292
//!     category: 224
//!     model: apple/iphone/xs-max
//!     name: Смартфон Apple iPhone XS Max 512GB (золотистый)
//!     price: 110000
//!     price_rrc: 116990
//!     quantity: 14
//!     parameters:
//!       "Диагональ (дюйм)": 6.5
//!       "Цвет": золотистый
//! ```
//!
//! [`fetch`] downloads the bytes and [`parse`] turns them into a validated
//! [`Feed`]. Neither touches the database; reconciliation lives in
//! [`crate::services::catalog`].

pub mod fetch;
pub mod parse;

use std::collections::BTreeMap;

use bazaar_core::CategoryId;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

pub use fetch::{feed_client, fetch_feed, validate_feed_url};
pub use parse::parse_feed;

/// Errors raised while fetching or parsing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The URL is not an absolute http(s) URL.
    #[error("Enter a valid URL: {0}")]
    InvalidUrl(String),

    /// The feed host could not be reached or the download failed midway.
    #[error("feed download failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The feed host answered with a non-success status.
    #[error("feed server responded with HTTP {0}")]
    Status(u16),

    /// The feed body is larger than the configured limit.
    #[error("feed is larger than the {limit} byte limit")]
    TooLarge { limit: usize },

    /// The document uses YAML features that are not plain data.
    #[error("feed line {line}: {construct} are not allowed")]
    UnsupportedConstruct { line: usize, construct: &'static str },

    /// The document does not match the feed structure.
    #[error("malformed feed: {0}")]
    Malformed(String),

    /// The document is well-formed but its contents are inconsistent.
    #[error("invalid feed: {0}")]
    Invalid(String),
}

impl FeedError {
    /// Whether the failure is on the feed host's side rather than in the document.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status(_) | Self::TooLarge { .. }
        )
    }
}

/// A parsed and validated seller feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Feed {
    /// Display name of the seller's shop.
    pub shop: String,
    /// Categories the goods belong to.
    pub categories: Vec<FeedCategory>,
    /// The shop's complete current listing.
    pub goods: Vec<FeedGood>,
}

/// A category entry in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedCategory {
    pub id: CategoryId,
    pub name: String,
}

/// A single listed good.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedGood {
    /// The seller's own SKU.
    pub id: i64,
    pub category: CategoryId,
    pub model: String,
    pub name: String,
    #[serde(deserialize_with = "parse::decimal")]
    pub price: Decimal,
    #[serde(deserialize_with = "parse::decimal")]
    pub price_rrc: Decimal,
    pub quantity: i32,
    /// Free-form attributes. Scalar values of any type are kept as text.
    #[serde(deserialize_with = "parse::scalar_map")]
    pub parameters: BTreeMap<String, String>,
}
