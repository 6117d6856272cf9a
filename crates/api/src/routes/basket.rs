//! Buyer basket endpoints.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use bazaar_core::OrderItemId;

use super::{ApiJson, status_ok};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::OrderView;
use crate::services::orders::{self, BasketQuantity, NewBasketItem};
use crate::state::AppState;

/// Body shared by the basket write endpoints.
#[derive(Debug, Deserialize)]
pub struct ItemsRequest<T> {
    pub items: Option<Vec<T>>,
}

impl<T> ItemsRequest<T> {
    fn into_items(self) -> Result<Vec<T>> {
        match self.items {
            Some(items) if !items.is_empty() => Ok(items),
            _ => Err(AppError::MissingArguments),
        }
    }
}

/// Show the current basket as a list of zero or one baskets.
#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn show(auth: RequireUser, State(state): State<AppState>) -> Result<Json<Vec<OrderView>>> {
    let basket = OrderRepository::new(state.pool()).basket(auth.0.id).await?;
    Ok(Json(basket.into_iter().collect()))
}

#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn add(
    auth: RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ItemsRequest<NewBasketItem>>,
) -> Result<Json<Value>> {
    let items = body.into_items()?;
    let created = orders::add_to_basket(state.pool(), auth.0.id, &items).await?;
    Ok(status_ok(Some(("Created", Value::from(created)))))
}

#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn update(
    auth: RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ItemsRequest<BasketQuantity>>,
) -> Result<Json<Value>> {
    let items = body.into_items()?;
    let updated = orders::update_basket(state.pool(), auth.0.id, &items).await?;
    Ok(status_ok(Some(("Updated", Value::from(updated)))))
}

#[instrument(skip_all, fields(user = %auth.0.id))]
pub async fn remove(
    auth: RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ItemsRequest<OrderItemId>>,
) -> Result<Json<Value>> {
    let items = body.into_items()?;
    let deleted = orders::remove_from_basket(state.pool(), auth.0.id, &items).await?;
    Ok(status_ok(Some(("Deleted", Value::from(deleted)))))
}
