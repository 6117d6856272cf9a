//! Basket changes and order placement.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{OrderId, OrderItemId, OrderState, ProductInfoId, UserId};

use crate::db::{OrderRepository, RepositoryError};

/// Errors from basket and order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("no items given")]
    NoItems,

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("product info {0} is not available")]
    ListingUnavailable(ProductInfoId),

    #[error("basket {0} not found")]
    BasketNotFound(OrderId),

    #[error("basket is empty")]
    EmptyBasket,

    /// Some items point at listings a seller has since replaced.
    #[error("basket has items that are no longer listed; remove them and add them again")]
    StaleItems,

    #[error("basket has items from a closed shop")]
    ShopClosed,
}

/// An item to add to the basket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NewBasketItem {
    pub product_info: ProductInfoId,
    pub quantity: i32,
}

/// A new quantity for an existing basket item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BasketQuantity {
    pub id: OrderItemId,
    pub quantity: i32,
}

const fn check_quantity(quantity: i32) -> Result<(), OrderError> {
    if quantity < 1 {
        return Err(OrderError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// Add listings to the buyer's basket, creating the basket if needed.
///
/// Either every item is added or none is. Returns the number of items added.
///
/// # Errors
///
/// Returns `OrderError::InvalidQuantity` or `OrderError::ListingUnavailable`
/// for a bad item.
#[instrument(skip(pool, items), fields(items = items.len()))]
pub async fn add_to_basket(
    pool: &PgPool,
    user: UserId,
    items: &[NewBasketItem],
) -> Result<usize, OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for item in items {
        check_quantity(item.quantity)?;
    }

    let mut tx = OrderRepository::new(pool).begin().await?;
    let basket = tx.lock_or_create_basket(user).await?;

    for item in items {
        let listing = tx
            .open_listing(item.product_info)
            .await?
            .ok_or(OrderError::ListingUnavailable(item.product_info))?;
        tx.add_item(basket, &listing, item.quantity).await?;
    }

    tx.commit().await?;
    Ok(items.len())
}

/// Set quantities of items in the buyer's basket.
///
/// Item IDs that are not in the basket are skipped. Returns how many items
/// were updated.
///
/// # Errors
///
/// Returns `OrderError::InvalidQuantity` for a quantity below 1.
#[instrument(skip(pool, items), fields(items = items.len()))]
pub async fn update_basket(
    pool: &PgPool,
    user: UserId,
    items: &[BasketQuantity],
) -> Result<usize, OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    for item in items {
        check_quantity(item.quantity)?;
    }

    let mut tx = OrderRepository::new(pool).begin().await?;
    let Some(basket) = tx.lock_basket(user).await? else {
        return Ok(0);
    };

    let mut updated = 0;
    for item in items {
        if tx.set_quantity(basket, item.id, item.quantity).await? {
            updated += 1;
        }
    }

    tx.commit().await?;
    Ok(updated)
}

/// Remove items from the buyer's basket. Returns how many were removed.
///
/// # Errors
///
/// Returns `OrderError::NoItems` if `items` is empty.
#[instrument(skip(pool, items), fields(items = items.len()))]
pub async fn remove_from_basket(
    pool: &PgPool,
    user: UserId,
    items: &[OrderItemId],
) -> Result<u64, OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }

    let mut tx = OrderRepository::new(pool).begin().await?;
    let Some(basket) = tx.lock_basket(user).await? else {
        return Ok(0);
    };

    let deleted = tx.delete_items(basket, items).await?;
    tx.commit().await?;
    Ok(deleted)
}

/// Turn the buyer's basket into a new order.
///
/// # Errors
///
/// - `OrderError::BasketNotFound` if `order` is not the buyer's basket
/// - `OrderError::EmptyBasket`, `OrderError::StaleItems` or
///   `OrderError::ShopClosed` if the basket cannot be placed
#[instrument(skip(pool))]
pub async fn place_order(pool: &PgPool, user: UserId, order: OrderId) -> Result<(), OrderError> {
    let mut tx = OrderRepository::new(pool).begin().await?;

    match tx.lock_basket(user).await? {
        Some(basket) if basket == order => {}
        _ => return Err(OrderError::BasketNotFound(order)),
    }

    let stats = tx.basket_stats(order).await?;
    if stats.items == 0 {
        return Err(OrderError::EmptyBasket);
    }
    if stats.stale > 0 {
        return Err(OrderError::StaleItems);
    }
    if stats.closed > 0 {
        return Err(OrderError::ShopClosed);
    }

    tx.set_state(order, OrderState::New).await?;
    tx.commit().await?;

    tracing::info!(order = %order, items = stats.items, "Order placed");
    Ok(())
}
