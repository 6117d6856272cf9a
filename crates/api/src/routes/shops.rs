//! Shop listing.

use axum::{
    Json,
    extract::State,
};
use tracing::instrument;

use super::{ApiQuery, PageParams};
use crate::db::ShopRepository;
use crate::error::Result;
use crate::models::{Page, Shop};
use crate::state::AppState;

/// List open shops.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<Page<Shop>>> {
    let page = page.resolve(state.config().page_size)?;
    let shops = ShopRepository::new(state.pool()).list_open(page).await?;
    Ok(Json(shops))
}
