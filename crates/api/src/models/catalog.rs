//! Catalog types returned by the query views.

use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{CategoryId, ProductInfoId, ShopId};

/// A seller's shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    /// Whether the shop is accepting orders.
    pub state: bool,
    /// The last feed URL ingested for this shop.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// One parameter of a listing, e.g. `{"parameter": "Цвет", "value": "золотистый"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductParameterView {
    pub parameter: String,
    pub value: String,
}

/// A shop's listing of a product, as shown to buyers.
#[derive(Debug, Clone, Serialize)]
pub struct ProductInfoView {
    pub id: ProductInfoId,
    pub model: String,
    pub external_id: i64,
    pub product: String,
    pub category: String,
    pub shop_id: ShopId,
    pub shop: String,
    pub quantity: i32,
    pub price: Decimal,
    pub price_rrc: Decimal,
    pub product_parameters: Vec<ProductParameterView>,
}
