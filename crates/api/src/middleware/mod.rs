//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (`x-request-id`)
//! 4. Rate limiting on `/products` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireSeller, RequireUser};
pub use rate_limit::api_rate_limiter;
pub use request_id::request_id_middleware;
