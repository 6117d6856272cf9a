//! Basket and order types returned to buyers and sellers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{OrderId, OrderItemId, OrderState, ProductInfoId, ShopId};

/// A line in a basket or order.
///
/// Items copy the listing's name, model and price when they are added, so an
/// order stays readable after the seller's next feed replaces the listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemView {
    pub id: OrderItemId,
    /// `None` once the listing has been replaced by a newer feed.
    pub product_info: Option<ProductInfoId>,
    pub shop_id: ShopId,
    pub product_name: String,
    pub model: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItemView {
    #[must_use]
    pub fn sum(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A basket or placed order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub total_sum: Decimal,
}

impl OrderView {
    /// Assemble a view, computing the total from the items.
    #[must_use]
    pub fn new(
        id: OrderId,
        state: OrderState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        items: Vec<OrderItemView>,
    ) -> Self {
        let total_sum = items.iter().map(OrderItemView::sum).sum();
        Self {
            id,
            state,
            created_at,
            updated_at,
            items,
            total_sum,
        }
    }
}
