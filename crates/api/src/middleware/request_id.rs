//! Request ID middleware for request tracing and correlation.
//!
//! The ID is recorded in the current tracing span, set as a Sentry tag,
//! and echoed in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request ID that is passed through unchanged.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Use the upstream ID if it is short printable ASCII, otherwise make one.
fn resolve_request_id(upstream: Option<&str>) -> String {
    upstream
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = resolve_request_id(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_upstream_id() {
        assert_eq!(resolve_request_id(Some("cf-ray-7d1a")), "cf-ray-7d1a");
    }

    #[test]
    fn test_replaces_unusable_ids() {
        for bad in [None, Some(""), Some("has space"), Some(&*"x".repeat(200))] {
            let id = resolve_request_id(bad);
            assert!(Uuid::parse_str(&id).is_ok(), "{bad:?} -> {id}");
        }
    }
}
