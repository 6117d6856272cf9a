//! Product search over the listings of open shops.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{CategoryId, ProductInfoId, ShopId};

use super::{ApiQuery, PageParams};
use crate::db::{CatalogRepository, ProductFilter};
use crate::error::{AppError, Result};
use crate::models::{Page, ProductInfoView};
use crate::state::AppState;

/// Filters for `GET /products`, named after the fields they match.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(rename = "product__name")]
    pub product_name: Option<String>,
    pub shop_id: Option<ShopId>,
    #[serde(rename = "product__category_id")]
    pub category_id: Option<CategoryId>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(q: ProductQuery) -> Self {
        Self {
            name: q.product_name.filter(|n| !n.is_empty()),
            shop_id: q.shop_id,
            category_id: q.category_id,
        }
    }
}

/// Search listings.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Page<ProductInfoView>>> {
    let page = page.resolve(state.config().page_size)?;
    let results = CatalogRepository::new(state.pool())
        .list_product_infos(&query.into(), page)
        .await?;
    Ok(Json(results))
}

/// Show a single listing.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<ProductInfoId>,
) -> Result<Json<ProductInfoView>> {
    CatalogRepository::new(state.pool())
        .get_product_info(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product info {id} not found")))
}
