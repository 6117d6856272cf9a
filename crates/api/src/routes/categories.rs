//! Category listing.

use axum::{
    Json,
    extract::State,
};
use tracing::instrument;

use super::{ApiQuery, PageParams};
use crate::db::CatalogRepository;
use crate::error::Result;
use crate::models::{Category, Page};
use crate::state::AppState;

/// List categories that have at least one open shop.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Page<Category>>> {
    let page = page.resolve(state.config().page_size)?;
    let categories = CatalogRepository::new(state.pool())
        .list_categories(page)
        .await?;
    Ok(Json(categories))
}
