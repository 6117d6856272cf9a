//! Seller catalog reconciliation.
//!
//! A seller's feed is the source of truth for their listing. Reconciling a
//! [`Feed`] for a seller:
//!
//! 1. takes a per-seller lock for the rest of the transaction,
//! 2. upserts the seller's shop with the feed's name and URL,
//! 3. upserts each category and attaches it to the shop,
//! 4. deletes the shop's current listing,
//! 5. recreates one listing per good, reusing products by `(name, category)`,
//! 6. attaches each good's parameters, creating parameter names on first use.
//!
//! Everything runs against a single [`CatalogTransaction`]. The caller commits
//! only if [`reconcile`] succeeds, so a failure at any step leaves the previous
//! listing in place.

#[cfg(test)]
mod memory;

use std::collections::{BTreeMap, HashSet};
use std::future::Future;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use bazaar_core::{
    CategoryId, CategoryNamePolicy, ParameterId, ProductId, ProductInfoId, SellerId, ShopId,
};

use crate::config::FeedConfig;
use crate::db::{PgCatalogTransaction, RepositoryError};
use crate::feed::{self, Feed, FeedError};

/// Storage operations used by reconciliation, all within one transaction.
pub trait CatalogTransaction: Send {
    /// Block until no other transaction is reconciling this seller.
    fn lock_seller(
        &mut self,
        seller: SellerId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Create the seller's shop or overwrite its name.
    ///
    /// The stored URL is replaced only when `url` is `Some`.
    fn upsert_shop(
        &mut self,
        seller: SellerId,
        name: &str,
        url: Option<&str>,
    ) -> impl Future<Output = Result<ShopId, RepositoryError>> + Send;

    /// The stored name of a category, if it exists.
    fn category_name(
        &mut self,
        id: CategoryId,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Create a category unless its ID is taken.
    ///
    /// Returns `None` if the category was created, otherwise its stored name.
    fn insert_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, RepositoryError>> + Send;

    fn rename_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Record that a shop lists in a category. Idempotent.
    fn attach_category(
        &mut self,
        category: CategoryId,
        shop: ShopId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every listing of a shop along with its parameters.
    fn delete_listings(
        &mut self,
        shop: ShopId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Find a product by name within a category, creating it if needed.
    ///
    /// The flag is `true` if the product was created.
    fn get_or_create_product(
        &mut self,
        name: &str,
        category: CategoryId,
    ) -> impl Future<Output = Result<(ProductId, bool), RepositoryError>> + Send;

    fn insert_listing(
        &mut self,
        listing: &NewListing<'_>,
    ) -> impl Future<Output = Result<ProductInfoId, RepositoryError>> + Send;

    /// Find a parameter by name, creating it if needed.
    fn get_or_create_parameter(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<ParameterId, RepositoryError>> + Send;

    fn insert_listing_parameter(
        &mut self,
        listing: ProductInfoId,
        parameter: ParameterId,
        value: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Make every change visible. Dropping without committing rolls back.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A listing to insert for a shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing<'a> {
    pub product: ProductId,
    pub shop: ShopId,
    pub external_id: i64,
    pub model: &'a str,
    pub price: Decimal,
    pub price_rrc: Decimal,
    pub quantity: i32,
}

/// Errors from reconciling a feed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A good references a category that neither the feed nor the database knows.
    #[error("good {good} references unknown category {category}")]
    UnknownCategory { good: i64, category: CategoryId },

    /// A known category arrived under a different name and the policy is `reject`.
    #[error("category {id} is named '{stored}', feed names it '{incoming}'")]
    CategoryNameConflict {
        id: CategoryId,
        stored: String,
        incoming: String,
    },
}

/// Errors from the full fetch, parse and reconcile flow.
#[derive(Debug, Error)]
pub enum CatalogUpdateError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl From<RepositoryError> for CatalogUpdateError {
    fn from(e: RepositoryError) -> Self {
        Self::Reconcile(ReconcileError::Repository(e))
    }
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub shop_id: ShopId,
    /// Categories in the feed.
    pub categories: usize,
    /// Products that did not exist before this feed.
    pub products_created: usize,
    /// Listings now held by the shop.
    pub listings: usize,
    /// Parameter values written.
    pub parameters: usize,
    /// Listings removed before the feed's goods were inserted.
    pub listings_removed: u64,
}

/// Apply a feed to a seller's catalog within `tx`.
///
/// Does not commit; see the module docs.
///
/// # Errors
///
/// - [`ReconcileError::UnknownCategory`] if a good's category does not exist
/// - [`ReconcileError::CategoryNameConflict`] under [`CategoryNamePolicy::Reject`]
/// - [`ReconcileError::Repository`] for storage failures
#[instrument(skip(tx, feed), fields(seller = %seller, shop = %feed.shop))]
pub async fn reconcile<T: CatalogTransaction>(
    tx: &mut T,
    seller: SellerId,
    feed: &Feed,
    source_url: Option<&str>,
    policy: CategoryNamePolicy,
) -> Result<ReconcileSummary, ReconcileError> {
    tx.lock_seller(seller).await?;

    let shop_id = tx.upsert_shop(seller, &feed.shop, source_url).await?;

    // Categories, products and parameters are shared between sellers. Rows
    // are touched in key order so concurrent feeds lock them in the same order.
    let mut categories: Vec<_> = feed.categories.iter().collect();
    categories.sort_by_key(|c| c.id);

    let mut known_categories = HashSet::with_capacity(categories.len());
    for category in categories {
        match tx.insert_category(category.id, &category.name).await? {
            None => {}
            Some(stored) if stored == category.name => {}
            Some(stored) => match policy {
                CategoryNamePolicy::Preserve => {
                    tracing::warn!(
                        category = %category.id,
                        stored = %stored,
                        incoming = %category.name,
                        "Feed renames a category; keeping the stored name"
                    );
                }
                CategoryNamePolicy::Update => {
                    tracing::info!(
                        category = %category.id,
                        from = %stored,
                        to = %category.name,
                        "Renaming category"
                    );
                    tx.rename_category(category.id, &category.name).await?;
                }
                CategoryNamePolicy::Reject => {
                    return Err(ReconcileError::CategoryNameConflict {
                        id: category.id,
                        stored,
                        incoming: category.name.clone(),
                    });
                }
            },
        }
        tx.attach_category(category.id, shop_id).await?;
        known_categories.insert(category.id);
    }

    for good in &feed.goods {
        if !known_categories.contains(&good.category) {
            if tx.category_name(good.category).await?.is_none() {
                return Err(ReconcileError::UnknownCategory {
                    good: good.id,
                    category: good.category,
                });
            }
            known_categories.insert(good.category);
        }
    }

    let listings_removed = tx.delete_listings(shop_id).await?;

    let mut products = BTreeMap::new();
    for good in &feed.goods {
        products.insert((good.category, good.name.as_str()), None);
    }
    let mut products_created = 0;
    for ((category, name), slot) in &mut products {
        let (product, created) = tx.get_or_create_product(name, *category).await?;
        if created {
            products_created += 1;
        }
        *slot = Some(product);
    }

    let mut parameter_ids = BTreeMap::new();
    for name in feed.goods.iter().flat_map(|g| g.parameters.keys()) {
        parameter_ids.insert(name.as_str(), None);
    }
    for (name, slot) in &mut parameter_ids {
        *slot = Some(tx.get_or_create_parameter(name).await?);
    }

    let mut parameters = 0;
    for good in &feed.goods {
        let product = products
            .get(&(good.category, good.name.as_str()))
            .copied()
            .flatten()
            .ok_or_else(|| missing_row("product", &good.name))?;

        let listing = tx
            .insert_listing(&NewListing {
                product,
                shop: shop_id,
                external_id: good.id,
                model: &good.model,
                price: good.price,
                price_rrc: good.price_rrc,
                quantity: good.quantity,
            })
            .await?;

        for (name, value) in &good.parameters {
            let parameter = parameter_ids
                .get(name.as_str())
                .copied()
                .flatten()
                .ok_or_else(|| missing_row("parameter", name))?;
            tx.insert_listing_parameter(listing, parameter, value).await?;
            parameters += 1;
        }
    }

    let summary = ReconcileSummary {
        shop_id,
        categories: feed.categories.len(),
        products_created,
        listings: feed.goods.len(),
        parameters,
        listings_removed,
    };
    tracing::info!(?summary, "Catalog reconciled");
    Ok(summary)
}

fn missing_row(kind: &str, name: &str) -> ReconcileError {
    ReconcileError::Repository(RepositoryError::DataCorruption(format!(
        "{kind} '{name}' was not resolved"
    )))
}

/// Fetch a seller's feed from `url` and replace their catalog with it.
///
/// The URL is validated before any network or database access.
///
/// # Errors
///
/// Returns [`CatalogUpdateError::Feed`] for URL, transport and document
/// problems, and [`CatalogUpdateError::Reconcile`] if the feed cannot be
/// applied. Nothing is persisted on error.
#[instrument(skip(pool, client, config))]
pub async fn update_catalog(
    pool: &PgPool,
    client: &reqwest::Client,
    config: &FeedConfig,
    seller: SellerId,
    url: &str,
) -> Result<ReconcileSummary, CatalogUpdateError> {
    let url = feed::validate_feed_url(url)?;
    let body = feed::fetch_feed(client, &url, config.max_bytes).await?;
    import_feed(pool, seller, &body, Some(&url), config.category_name_policy).await
}

/// Parse feed bytes and replace a seller's catalog with them.
///
/// # Errors
///
/// See [`update_catalog`].
pub async fn import_feed(
    pool: &PgPool,
    seller: SellerId,
    body: &[u8],
    source_url: Option<&Url>,
    policy: CategoryNamePolicy,
) -> Result<ReconcileSummary, CatalogUpdateError> {
    let feed = feed::parse_feed(body)?;

    let mut tx = PgCatalogTransaction::begin(pool).await?;
    let summary = reconcile(&mut tx, seller, &feed, source_url.map(Url::as_str), policy).await?;
    tx.commit().await?;

    Ok(summary)
}
