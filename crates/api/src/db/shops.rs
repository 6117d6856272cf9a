//! Shop repository.

use sqlx::PgPool;

use bazaar_core::SellerId;

use super::{Pagination, RepositoryError};
use crate::models::{Page, Shop};

/// Repository for shop reads and the open/closed toggle.
///
/// Shops are created and renamed only by catalog reconciliation.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the shop owned by a seller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_seller(&self, seller: SellerId) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(
            r"
            SELECT id, name, state, url
            FROM bazaar.shop
            WHERE user_id = $1
            ",
        )
        .bind(seller.user_id())
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Open or close a seller's shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the seller has no shop.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_state(&self, seller: SellerId, state: bool) -> Result<Shop, RepositoryError> {
        sqlx::query_as::<_, Shop>(
            r"
            UPDATE bazaar.shop
            SET state = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, name, state, url
            ",
        )
        .bind(seller.user_id())
        .bind(state)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// List open shops ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_open(&self, page: Pagination) -> Result<Page<Shop>, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bazaar.shop WHERE state")
            .fetch_one(self.pool)
            .await?;

        let shops = sqlx::query_as::<_, Shop>(
            r"
            SELECT id, name, state, url
            FROM bazaar.shop
            WHERE state
            ORDER BY id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(count, shops))
    }
}
