//! Catalog storage: the reconciliation transaction and the buyer-facing views.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use bazaar_core::{CategoryId, ParameterId, ProductId, ProductInfoId, SellerId, ShopId};

use super::{Pagination, RepositoryError};
use crate::models::{Category, Page, ProductInfoView, ProductParameterView};
use crate::services::catalog::{CatalogTransaction, NewListing};

/// First key of the two-key advisory lock; the second is the seller's user ID.
const CATALOG_LOCK_CLASS: i32 = 0x4361_7461; // "Cata"

// =============================================================================
// Reconciliation
// =============================================================================

/// A `PostgreSQL` transaction used to reconcile one feed.
pub struct PgCatalogTransaction<'c> {
    tx: Transaction<'c, Postgres>,
}

impl PgCatalogTransaction<'static> {
    /// Begin a transaction on the pool.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection is available.
    pub async fn begin(pool: &PgPool) -> Result<Self, RepositoryError> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl CatalogTransaction for PgCatalogTransaction<'_> {
    async fn lock_seller(&mut self, seller: SellerId) -> Result<(), RepositoryError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(CATALOG_LOCK_CLASS)
            .bind(seller.user_id())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn upsert_shop(
        &mut self,
        seller: SellerId,
        name: &str,
        url: Option<&str>,
    ) -> Result<ShopId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ShopId>(
            r"
            INSERT INTO bazaar.shop AS shop (user_id, name, url)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET name = EXCLUDED.name,
                url = COALESCE(EXCLUDED.url, shop.url),
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(seller.user_id())
        .bind(name)
        .bind(url)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn category_name(&mut self, id: CategoryId) -> Result<Option<String>, RepositoryError> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM bazaar.category WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(name)
    }

    async fn insert_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        // A concurrent insert of the same id makes this wait for that
        // transaction, then skip the row.
        let inserted = sqlx::query_scalar::<_, CategoryId>(
            r"
            INSERT INTO bazaar.category (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        if inserted.is_some() {
            return Ok(None);
        }

        self.category_name(id)
            .await?
            .map(Some)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("category {id} vanished")))
    }

    async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.category SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn attach_category(
        &mut self,
        category: CategoryId,
        shop: ShopId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.category_shop (category_id, shop_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(category)
        .bind(shop)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_listings(&mut self, shop: ShopId) -> Result<u64, RepositoryError> {
        // product_parameter rows go with their listing (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM bazaar.product_info WHERE shop_id = $1")
            .bind(shop)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_or_create_product(
        &mut self,
        name: &str,
        category: CategoryId,
    ) -> Result<(ProductId, bool), RepositoryError> {
        // The no-op update makes RETURNING yield the existing row; xmax is 0
        // only for a freshly inserted tuple.
        let row = sqlx::query_as::<_, (ProductId, bool)>(
            r"
            INSERT INTO bazaar.product (name, category_id)
            VALUES ($1, $2)
            ON CONFLICT (name, category_id) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, (xmax = 0) AS created
            ",
        )
        .bind(name)
        .bind(category)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn insert_listing(
        &mut self,
        listing: &NewListing<'_>,
    ) -> Result<ProductInfoId, RepositoryError> {
        sqlx::query_scalar::<_, ProductInfoId>(
            r"
            INSERT INTO bazaar.product_info
                (product_id, shop_id, external_id, model, price, price_rrc, quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(listing.product)
        .bind(listing.shop)
        .bind(listing.external_id)
        .bind(listing.model)
        .bind(listing.price)
        .bind(listing.price_rrc)
        .bind(listing.quantity)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "listing already exists"))
    }

    async fn get_or_create_parameter(&mut self, name: &str) -> Result<ParameterId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ParameterId>(
            r"
            INSERT INTO bazaar.parameter (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_listing_parameter(
        &mut self,
        listing: ProductInfoId,
        parameter: ParameterId,
        value: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.product_parameter (product_info_id, parameter_id, value)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(listing)
        .bind(parameter)
        .bind(value)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "parameter already set"))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Views
// =============================================================================

/// Filters accepted by the product listing view. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Exact product name.
    pub name: Option<String>,
    pub shop_id: Option<ShopId>,
    pub category_id: Option<CategoryId>,
}

#[derive(sqlx::FromRow)]
struct ProductInfoRow {
    id: ProductInfoId,
    model: String,
    external_id: i64,
    product: String,
    category: String,
    shop_id: ShopId,
    shop: String,
    quantity: i32,
    price: Decimal,
    price_rrc: Decimal,
}

#[derive(sqlx::FromRow)]
struct ParameterRow {
    product_info_id: ProductInfoId,
    parameter: String,
    value: String,
}

const PRODUCT_INFO_SELECT: &str = r"
    SELECT pi.id, pi.model, pi.external_id,
           p.name AS product, c.name AS category,
           s.id AS shop_id, s.name AS shop,
           pi.quantity, pi.price, pi.price_rrc
    FROM bazaar.product_info pi
    JOIN bazaar.product p ON p.id = pi.product_id
    JOIN bazaar.category c ON c.id = p.category_id
    JOIN bazaar.shop s ON s.id = pi.shop_id
";

const PRODUCT_INFO_FILTER: &str = r"
    WHERE s.state
      AND ($1::text IS NULL OR p.name = $1)
      AND ($2::int IS NULL OR pi.shop_id = $2)
      AND ($3::int IS NULL OR p.category_id = $3)
";

/// Read-only catalog queries for buyers. Only open shops are visible.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Categories with at least one open shop, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(
        &self,
        page: Pagination,
    ) -> Result<Page<Category>, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT cs.category_id)
            FROM bazaar.category_shop cs
            JOIN bazaar.shop s ON s.id = cs.shop_id
            WHERE s.state
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT c.id, c.name
            FROM bazaar.category c
            WHERE EXISTS (
                SELECT 1
                FROM bazaar.category_shop cs
                JOIN bazaar.shop s ON s.id = cs.shop_id
                WHERE cs.category_id = c.id AND s.state
            )
            ORDER BY c.id
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(count, categories))
    }

    /// Listings of open shops matching `filter`, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_product_infos(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> Result<Page<ProductInfoView>, RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*)
            FROM bazaar.product_info pi
            JOIN bazaar.product p ON p.id = pi.product_id
            JOIN bazaar.shop s ON s.id = pi.shop_id
            {PRODUCT_INFO_FILTER}
            "
        ))
        .bind(filter.name.as_deref())
        .bind(filter.shop_id)
        .bind(filter.category_id)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductInfoRow>(&format!(
            "{PRODUCT_INFO_SELECT} {PRODUCT_INFO_FILTER} ORDER BY pi.id LIMIT $4 OFFSET $5"
        ))
        .bind(filter.name.as_deref())
        .bind(filter.shop_id)
        .bind(filter.category_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool)
        .await?;

        let results = self.with_parameters(rows).await?;
        Ok(Page::new(count, results))
    }

    /// A single listing of an open shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_product_info(
        &self,
        id: ProductInfoId,
    ) -> Result<Option<ProductInfoView>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductInfoRow>(&format!(
            "{PRODUCT_INFO_SELECT} WHERE s.state AND pi.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.with_parameters(vec![row]).await?.into_iter().next())
    }

    /// Attach parameters to a page of rows with a single query.
    async fn with_parameters(
        &self,
        rows: Vec<ProductInfoRow>,
    ) -> Result<Vec<ProductInfoView>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductInfoId> = rows.iter().map(|r| r.id).collect();
        let parameters = sqlx::query_as::<_, ParameterRow>(
            r"
            SELECT pp.product_info_id, pa.name AS parameter, pp.value
            FROM bazaar.product_parameter pp
            JOIN bazaar.parameter pa ON pa.id = pp.parameter_id
            WHERE pp.product_info_id = ANY($1)
            ORDER BY pp.product_info_id, pa.name
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_listing: HashMap<ProductInfoId, Vec<ProductParameterView>> = HashMap::new();
        for p in parameters {
            by_listing
                .entry(p.product_info_id)
                .or_default()
                .push(ProductParameterView {
                    parameter: p.parameter,
                    value: p.value,
                });
        }

        Ok(rows
            .into_iter()
            .map(|r| ProductInfoView {
                product_parameters: by_listing.remove(&r.id).unwrap_or_default(),
                id: r.id,
                model: r.model,
                external_id: r.external_id,
                product: r.product,
                category: r.category,
                shop_id: r.shop_id,
                shop: r.shop,
                quantity: r.quantity,
                price: r.price,
                price_rrc: r.price_rrc,
            })
            .collect())
    }
}
