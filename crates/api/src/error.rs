//! Unified error handling with Sentry integration.
//!
//! Every failed request is answered with the same JSON envelope:
//!
//! ```json
//! {"Status": false, "Error": "Enter a valid URL: relative URL without a base"}
//! ```
//!
//! Missing arguments and unparseable state values use the key `Errors`
//! instead of `Error`; clients of the marketplace API rely on both.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use bazaar_core::TruthValueError;

use crate::db::RepositoryError;
use crate::feed::FeedError;
use crate::services::auth::AuthError;
use crate::services::catalog::{CatalogUpdateError, ReconcileError};
use crate::services::orders::OrderError;

/// Message returned when a required body field is absent or empty.
pub const MISSING_ARGUMENTS: &str = "Missing required arguments";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Fetching or parsing a seller feed failed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Applying a seller feed failed.
    #[error("Catalog error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Basket or order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A required request field is missing.
    #[error("{MISSING_ARGUMENTS}")]
    MissingArguments,

    /// A shop state value is not a recognised truth value.
    #[error(transparent)]
    InvalidState(#[from] TruthValueError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not use this endpoint.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogUpdateError> for AppError {
    fn from(e: CatalogUpdateError) -> Self {
        match e {
            CatalogUpdateError::Feed(e) => Self::Feed(e),
            CatalogUpdateError::Reconcile(e) => Self::Reconcile(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl AppError {
    /// Whether this is a server-side failure that should reach Sentry.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Repository(_))
                | Self::Reconcile(ReconcileError::Repository(_))
                | Self::Order(OrderError::Repository(_))
        )
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidToken | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Feed(err) if err.is_transport() => StatusCode::BAD_GATEWAY,
            Self::Feed(FeedError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            Self::Feed(_) | Self::Reconcile(ReconcileError::UnknownCategory { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Reconcile(_) => StatusCode::CONFLICT,
            Self::Order(err) => match err {
                OrderError::NoItems
                | OrderError::InvalidQuantity(_)
                | OrderError::ListingUnavailable(_) => StatusCode::BAD_REQUEST,
                OrderError::BasketNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::CONFLICT,
            },
            Self::MissingArguments | Self::InvalidState(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The envelope key for this error's message.
    const fn message_key(&self) -> &'static str {
        match self {
            Self::MissingArguments | Self::InvalidState(_) => "Errors",
            _ => "Error",
        }
    }

    fn client_message(&self) -> String {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidToken | AuthError::UserNotFound => {
                    "Invalid token".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Feed(err) => err.to_string(),
            Self::Reconcile(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::InvalidState(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Feed(ref e) if e.is_transport()) {
            tracing::warn!(error = %self, "Seller feed unavailable");
        }

        let mut body = serde_json::Map::new();
        body.insert("Status".to_string(), Value::Bool(false));
        body.insert(
            self.message_key().to_string(),
            Value::String(self.client_message()),
        );

        (self.status(), Json(Value::Object(body))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
