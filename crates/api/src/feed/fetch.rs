//! Feed download.

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::instrument;
use url::Url;

use super::FeedError;
use crate::config::FeedConfig;

/// Check that `raw` is an absolute http(s) URL with a host.
///
/// This runs before any network access, so a rejected URL never leaves the
/// process.
///
/// # Errors
///
/// Returns [`FeedError::InvalidUrl`] describing the problem.
pub fn validate_feed_url(raw: &str) -> Result<Url, FeedError> {
    let url = Url::parse(raw.trim()).map_err(|e| FeedError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FeedError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FeedError::InvalidUrl("missing host".to_string()));
    }

    Ok(url)
}

/// Build the HTTP client used for feed downloads.
///
/// # Errors
///
/// Returns [`FeedError::Transport`] if the TLS backend cannot be initialised.
pub fn feed_client(config: &FeedConfig) -> Result<reqwest::Client, FeedError> {
    Ok(reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("bazaar/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Download a feed, enforcing the size limit while streaming.
///
/// # Errors
///
/// - [`FeedError::Transport`] if the request fails or times out
/// - [`FeedError::Status`] for a non-2xx response
/// - [`FeedError::TooLarge`] if the body exceeds `max_bytes`
#[instrument(skip(client), fields(url = %url))]
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &Url,
    max_bytes: usize,
) -> Result<Bytes, FeedError> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "Feed host returned an error status");
        return Err(FeedError::Status(status.as_u16()));
    }

    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err(FeedError::TooLarge { limit: max_bytes });
    }

    let mut body = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > max_bytes {
            return Err(FeedError::TooLarge { limit: max_bytes });
        }
        body.extend_from_slice(&chunk);
    }

    tracing::debug!(bytes = body.len(), "Feed downloaded");
    Ok(body.freeze())
}
