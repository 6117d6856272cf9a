//! Basket and order repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{OrderId, OrderItemId, OrderState, ProductInfoId, ShopId, UserId};

use super::RepositoryError;
use crate::models::{OrderItemView, OrderView};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    state: OrderState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    order_id: OrderId,
    #[sqlx(flatten)]
    item: OrderItemView,
}

/// The parts of a listing copied into a basket item.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ListingSnapshot {
    pub id: ProductInfoId,
    pub shop_id: ShopId,
    pub product_name: String,
    pub model: String,
    pub price: Decimal,
}

/// Counts used to decide whether a basket can be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct BasketStats {
    pub items: i64,
    /// Items whose listing was removed by a later feed.
    pub stale: i64,
    /// Items whose shop is currently closed.
    pub closed: i64,
}

/// Repository for reading baskets and orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Begin a transaction for basket changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(&self) -> Result<BasketTransaction<'static>, RepositoryError> {
        Ok(BasketTransaction {
            tx: self.pool.begin().await?,
        })
    }

    /// The buyer's open basket with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn basket(&self, user: UserId) -> Result<Option<OrderView>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, state, created_at, updated_at
            FROM bazaar.order
            WHERE user_id = $1 AND state = 'basket'
            ",
        )
        .bind(user)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_items(vec![row], None).await?.into_iter().next())
    }

    /// The buyer's placed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn placed_orders(&self, user: UserId) -> Result<Vec<OrderView>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, state, created_at, updated_at
            FROM bazaar.order
            WHERE user_id = $1 AND state <> 'basket'
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows, None).await
    }

    /// Placed orders containing items from `shop`, listing only those items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn partner_orders(&self, shop: ShopId) -> Result<Vec<OrderView>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT o.id, o.state, o.created_at, o.updated_at
            FROM bazaar.order o
            WHERE o.state <> 'basket'
              AND EXISTS (
                  SELECT 1 FROM bazaar.order_item oi
                  WHERE oi.order_id = o.id AND oi.shop_id = $1
              )
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows, Some(shop)).await
    }

    /// Load items for `orders` in one query, optionally restricted to a shop.
    async fn with_items(
        &self,
        orders: Vec<OrderRow>,
        shop: Option<ShopId>,
    ) -> Result<Vec<OrderView>, RepositoryError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT order_id, id, product_info_id AS product_info, shop_id,
                   product_name, model, price, quantity
            FROM bazaar.order_item
            WHERE order_id = ANY($1)
              AND ($2::int IS NULL OR shop_id = $2)
            ORDER BY order_id, id
            ",
        )
        .bind(&ids)
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItemView>> = HashMap::new();
        for row in items {
            by_order.entry(row.order_id).or_default().push(row.item);
        }

        Ok(orders
            .into_iter()
            .map(|o| {
                let items = by_order.remove(&o.id).unwrap_or_default();
                OrderView::new(o.id, o.state, o.created_at, o.updated_at, items)
            })
            .collect())
    }
}

/// A transaction over one buyer's basket.
pub struct BasketTransaction<'c> {
    tx: Transaction<'c, Postgres>,
}

impl BasketTransaction<'_> {
    /// Get the buyer's basket, creating it if needed, and lock it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn lock_or_create_basket(&mut self, user: UserId) -> Result<OrderId, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.order (user_id, state)
            VALUES ($1, 'basket')
            ON CONFLICT (user_id) WHERE state = 'basket' DO NOTHING
            ",
        )
        .bind(user)
        .execute(&mut *self.tx)
        .await?;

        self.lock_basket(user)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption("basket vanished".to_owned()))
    }

    /// Lock the buyer's basket if they have one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_basket(&mut self, user: UserId) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, OrderId>(
            r"
            SELECT id FROM bazaar.order
            WHERE user_id = $1 AND state = 'basket'
            FOR UPDATE
            ",
        )
        .bind(user)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(id)
    }

    /// A listing of an open shop, as copied into a basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn open_listing(
        &mut self,
        id: ProductInfoId,
    ) -> Result<Option<ListingSnapshot>, RepositoryError> {
        let listing = sqlx::query_as::<_, ListingSnapshot>(
            r"
            SELECT pi.id, pi.shop_id, p.name AS product_name, pi.model, pi.price
            FROM bazaar.product_info pi
            JOIN bazaar.product p ON p.id = pi.product_id
            JOIN bazaar.shop s ON s.id = pi.shop_id
            WHERE pi.id = $1 AND s.state
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(listing)
    }

    /// Add a listing to a basket, adding to the quantity if it is already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn add_item(
        &mut self,
        order: OrderId,
        listing: &ListingSnapshot,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.order_item AS oi
                (order_id, product_info_id, shop_id, product_name, model, price, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id, product_info_id) DO UPDATE
            SET quantity = oi.quantity + EXCLUDED.quantity,
                price = EXCLUDED.price
            ",
        )
        .bind(order)
        .bind(listing.id)
        .bind(listing.shop_id)
        .bind(&listing.product_name)
        .bind(&listing.model)
        .bind(listing.price)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Set the quantity of a basket item. Returns `false` if no such item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &mut self,
        order: OrderId,
        item: OrderItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE bazaar.order_item SET quantity = $3 WHERE order_id = $1 AND id = $2",
        )
        .bind(order)
        .bind(item)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove items from a basket. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_items(
        &mut self,
        order: OrderId,
        items: &[OrderItemId],
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM bazaar.order_item WHERE order_id = $1 AND id = ANY($2)")
                .bind(order)
                .bind(items)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    /// Item counts for a basket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn basket_stats(&mut self, order: OrderId) -> Result<BasketStats, RepositoryError> {
        let stats = sqlx::query_as::<_, BasketStats>(
            r"
            SELECT COUNT(*) AS items,
                   COUNT(*) FILTER (WHERE oi.product_info_id IS NULL) AS stale,
                   COUNT(*) FILTER (WHERE NOT s.state) AS closed
            FROM bazaar.order_item oi
            JOIN bazaar.shop s ON s.id = oi.shop_id
            WHERE oi.order_id = $1
            ",
        )
        .bind(order)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stats)
    }

    /// Move an order to a new state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_state(&mut self, order: OrderId, state: OrderState) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE bazaar.order SET state = $2, updated_at = NOW() WHERE id = $1")
            .bind(order)
            .bind(state)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Commit all basket changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the commit fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
