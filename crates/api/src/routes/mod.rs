//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog (public)
//! GET    /categories            - Categories with an open shop
//! GET    /shops                 - Open shops
//! GET    /products              - Listing search (rate limited)
//! GET    /products/{id}         - Single listing
//!
//! # Sellers (shop token)
//! POST   /seller/update         - Replace catalog from a feed URL
//! GET    /seller/state          - Current shop and its open/closed state
//! POST   /seller/state          - Open or close the shop
//! GET    /partner/orders        - Orders containing the shop's goods
//!
//! # Buyers (any token)
//! GET    /basket                - Current basket
//! POST   /basket                - Add items
//! PUT    /basket                - Change item quantities
//! DELETE /basket                - Remove items
//! GET    /order                 - Placed orders
//! POST   /order                 - Place the basket
//! ```
//!
//! List endpoints take `limit` and `offset` query parameters and answer with
//! `{"count": n, "results": [...]}`.

pub mod basket;
pub mod categories;
pub mod orders;
pub mod products;
pub mod seller;
pub mod shops;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::MAX_PAGE_SIZE;
use crate::db::Pagination;
use crate::error::AppError;
use crate::middleware::api_rate_limiter;
use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    let products = Router::new()
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::detail))
        .layer(api_rate_limiter());

    Router::new()
        .route("/categories", get(categories::list))
        .route("/shops", get(shops::list))
        .merge(products)
        .route("/seller/update", post(seller::update_catalog))
        .route("/seller/state", get(seller::get_state).post(seller::set_state))
        .route("/partner/orders", get(orders::partner_orders))
        .route(
            "/basket",
            get(basket::show)
                .post(basket::add)
                .put(basket::update)
                .delete(basket::remove),
        )
        .route("/order", get(orders::list).post(orders::place))
}

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `{"Status": true}` plus any extra fields.
fn status_ok(extra: Option<(&str, Value)>) -> Json<Value> {
    let mut body = json!({ "Status": true });
    if let (Some((key, value)), Some(map)) = (extra, body.as_object_mut()) {
        map.insert(key.to_string(), value);
    }
    Json(body)
}

/// `limit` and `offset` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Resolve against the configured default page size.
    ///
    /// Limits above [`MAX_PAGE_SIZE`] are clamped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-positive limit or negative offset.
    pub fn resolve(self, default_limit: u32) -> Result<Pagination, AppError> {
        let limit = self.limit.unwrap_or_else(|| i64::from(default_limit));
        if limit < 1 {
            return Err(AppError::BadRequest("limit must be at least 1".to_string()));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest("offset must not be negative".to_string()));
        }

        Ok(Pagination {
            limit: limit.min(i64::from(MAX_PAGE_SIZE)),
            offset,
        })
    }
}
