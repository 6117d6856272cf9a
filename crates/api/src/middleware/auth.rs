//! Token authentication extractors.
//!
//! Clients send `Authorization: Token <token>`; `Bearer` is accepted too.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use bazaar_core::SellerId;

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Extractor that requires an authenticated user of any kind.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires an authenticated shop account.
///
/// Rejects buyers with 403.
pub struct RequireSeller {
    pub user: CurrentUser,
    pub seller: SellerId,
}

/// Pull the token out of an `Authorization` header value.
fn parse_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    (scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer"))
        .then_some(token)
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_token)
            .ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided".to_string())
            })?;

        let user = AuthService::new(state.pool()).authenticate(token).await?;

        tracing::Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        let seller = user
            .seller_id()
            .ok_or_else(|| AppError::Forbidden("Only for shops".to_string()))?;

        Ok(Self { user, seller })
    }
}
