//! Seller catalog and shop state endpoints.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use bazaar_core::parse_truth_value;

use super::{ApiJson, status_ok};
use crate::db::{RepositoryError, ShopRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireSeller;
use crate::models::Shop;
use crate::services::catalog;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateCatalogRequest {
    pub url: Option<String>,
}

/// Replace the seller's catalog with the feed at `url`.
#[instrument(skip_all, fields(seller = %auth.seller))]
pub async fn update_catalog(
    auth: RequireSeller,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateCatalogRequest>,
) -> Result<Json<Value>> {
    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or(AppError::MissingArguments)?;

    add_breadcrumb("catalog", "Catalog update requested", Some(&[("url", url.as_str())]));

    catalog::update_catalog(
        state.pool(),
        state.feed_client(),
        &state.config().feed,
        auth.seller,
        &url,
    )
    .await?;

    Ok(status_ok(None))
}

/// Show the seller's shop.
#[instrument(skip_all, fields(seller = %auth.seller))]
pub async fn get_state(auth: RequireSeller, State(state): State<AppState>) -> Result<Json<Shop>> {
    ShopRepository::new(state.pool())
        .get_by_seller(auth.seller)
        .await?
        .map(Json)
        .ok_or_else(no_shop)
}

#[derive(Debug, Deserialize)]
pub struct SetStateRequest {
    /// A truth value such as `"true"`, `"off"` or `1`.
    pub state: Option<Value>,
}

/// Text of a `state` value as the truth-value parser sees it.
///
/// Returns `None` for an absent, null or empty value.
fn state_text(value: Option<Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.trim().is_empty()).then_some(text)
}

/// Open or close the seller's shop.
#[instrument(skip_all, fields(seller = %auth.seller))]
pub async fn set_state(
    auth: RequireSeller,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SetStateRequest>,
) -> Result<Json<Value>> {
    let raw = state_text(body.state).ok_or(AppError::MissingArguments)?;
    let open = parse_truth_value(&raw)?;

    ShopRepository::new(state.pool())
        .set_state(auth.seller, open)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => no_shop(),
            other => other.into(),
        })?;

    tracing::info!(open, "Shop state changed");
    Ok(status_ok(None))
}

fn no_shop() -> AppError {
    AppError::NotFound("Shop not found; upload a catalog first".to_string())
}
