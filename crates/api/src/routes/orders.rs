//! Placed orders for buyers and sellers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use bazaar_core::OrderId;

use super::{ApiJson, status_ok};
use crate::db::{OrderRepository, ShopRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireSeller, RequireUser};
use crate::models::OrderView;
use crate::services::orders;
use crate::state::AppState;

/// The buyer's placed orders, newest first.
#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn list(auth: RequireUser, State(state): State<AppState>) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .placed_orders(auth.0.id)
        .await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub id: Option<OrderId>,
}

/// Place the buyer's basket.
#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn place(
    auth: RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<Json<Value>> {
    let id = body.id.ok_or(AppError::MissingArguments)?;
    orders::place_order(state.pool(), auth.0.id, id).await?;
    Ok(status_ok(None))
}

/// Orders containing the seller's goods.
#[instrument(skip_all, fields(seller = %auth.seller))]
pub async fn partner_orders(
    auth: RequireSeller,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderView>>> {
    let shop = ShopRepository::new(state.pool())
        .get_by_seller(auth.seller)
        .await?
        .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;

    let orders = OrderRepository::new(state.pool())
        .partner_orders(shop.id)
        .await?;
    Ok(Json(orders))
}
