//! In-memory catalog store for reconciliation tests.
//!
//! A transaction holds the store's lock from `begin` until it is committed or
//! dropped, and works on a private copy that `commit` writes back. Dropping
//! an uncommitted transaction therefore discards its changes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{CategoryId, ParameterId, ProductId, ProductInfoId, SellerId, ShopId};

use super::{CatalogTransaction, NewListing};
use crate::db::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StoredShop {
    pub seller: SellerId,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StoredListing {
    pub product: ProductId,
    pub shop: ShopId,
    pub external_id: i64,
    pub model: String,
    pub price: Decimal,
    pub price_rrc: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default)]
pub(super) struct CatalogState {
    pub shops: BTreeMap<ShopId, StoredShop>,
    pub categories: BTreeMap<CategoryId, String>,
    pub category_shop: BTreeSet<(CategoryId, ShopId)>,
    pub products: BTreeMap<ProductId, (String, CategoryId)>,
    pub listings: BTreeMap<ProductInfoId, StoredListing>,
    pub parameters: BTreeMap<ParameterId, String>,
    pub listing_parameters: BTreeMap<(ProductInfoId, ParameterId), String>,
    next_id: i32,
}

impl CatalogState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn shop_of(&self, seller: SellerId) -> Option<(ShopId, &StoredShop)> {
        self.shops
            .iter()
            .find(|(_, shop)| shop.seller == seller)
            .map(|(id, shop)| (*id, shop))
    }

    /// External IDs of a shop's listings, sorted.
    pub fn external_ids(&self, shop: ShopId) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .listings
            .values()
            .filter(|l| l.shop == shop)
            .map(|l| l.external_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct MemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl MemoryCatalog {
    pub async fn begin(&self) -> MemoryTransaction {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        MemoryTransaction { guard, work }
    }

    pub async fn snapshot(&self) -> CatalogState {
        self.state.lock().await.clone()
    }
}

pub(super) struct MemoryTransaction {
    guard: OwnedMutexGuard<CatalogState>,
    work: CatalogState,
}

impl CatalogTransaction for MemoryTransaction {
    // The whole store is already held by `begin`.
    async fn lock_seller(&mut self, _seller: SellerId) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn upsert_shop(
        &mut self,
        seller: SellerId,
        name: &str,
        url: Option<&str>,
    ) -> Result<ShopId, RepositoryError> {
        if let Some((id, _)) = self.work.shop_of(seller) {
            if let Some(shop) = self.work.shops.get_mut(&id) {
                shop.name = name.to_owned();
                if let Some(url) = url {
                    shop.url = Some(url.to_owned());
                }
            }
            return Ok(id);
        }

        let id = ShopId::new(self.work.next_id());
        self.work.shops.insert(
            id,
            StoredShop {
                seller,
                name: name.to_owned(),
                url: url.map(str::to_owned),
            },
        );
        Ok(id)
    }

    async fn category_name(&mut self, id: CategoryId) -> Result<Option<String>, RepositoryError> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn insert_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        if let Some(stored) = self.work.categories.get(&id) {
            return Ok(Some(stored.clone()));
        }
        self.work.categories.insert(id, name.to_owned());
        Ok(None)
    }

    async fn rename_category(&mut self, id: CategoryId, name: &str) -> Result<(), RepositoryError> {
        let stored = self
            .work
            .categories
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        name.clone_into(stored);
        Ok(())
    }

    async fn attach_category(
        &mut self,
        category: CategoryId,
        shop: ShopId,
    ) -> Result<(), RepositoryError> {
        self.work.category_shop.insert((category, shop));
        Ok(())
    }

    async fn delete_listings(&mut self, shop: ShopId) -> Result<u64, RepositoryError> {
        let doomed: Vec<ProductInfoId> = self
            .work
            .listings
            .iter()
            .filter(|(_, l)| l.shop == shop)
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            self.work.listings.remove(id);
        }
        self.work
            .listing_parameters
            .retain(|(listing, _), _| !doomed.contains(listing));

        Ok(doomed.len() as u64)
    }

    async fn get_or_create_product(
        &mut self,
        name: &str,
        category: CategoryId,
    ) -> Result<(ProductId, bool), RepositoryError> {
        if let Some((id, _)) = self
            .work
            .products
            .iter()
            .find(|(_, (n, c))| n == name && *c == category)
        {
            return Ok((*id, false));
        }

        let id = ProductId::new(self.work.next_id());
        self.work.products.insert(id, (name.to_owned(), category));
        Ok((id, true))
    }

    async fn insert_listing(
        &mut self,
        listing: &NewListing<'_>,
    ) -> Result<ProductInfoId, RepositoryError> {
        if self
            .work
            .listings
            .values()
            .any(|l| l.shop == listing.shop && l.external_id == listing.external_id)
        {
            return Err(RepositoryError::Conflict("duplicate listing".to_owned()));
        }

        let id = ProductInfoId::new(self.work.next_id());
        self.work.listings.insert(
            id,
            StoredListing {
                product: listing.product,
                shop: listing.shop,
                external_id: listing.external_id,
                model: listing.model.to_owned(),
                price: listing.price,
                price_rrc: listing.price_rrc,
                quantity: listing.quantity,
            },
        );
        Ok(id)
    }

    async fn get_or_create_parameter(&mut self, name: &str) -> Result<ParameterId, RepositoryError> {
        if let Some((id, _)) = self.work.parameters.iter().find(|(_, n)| *n == name) {
            return Ok(*id);
        }

        let id = ParameterId::new(self.work.next_id());
        self.work.parameters.insert(id, name.to_owned());
        Ok(id)
    }

    async fn insert_listing_parameter(
        &mut self,
        listing: ProductInfoId,
        parameter: ParameterId,
        value: &str,
    ) -> Result<(), RepositoryError> {
        if self
            .work
            .listing_parameters
            .insert((listing, parameter), value.to_owned())
            .is_some()
        {
            return Err(RepositoryError::Conflict("duplicate parameter".to_owned()));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Self { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{CategoryNamePolicy, UserId};

    use super::*;
    use crate::feed::parse_feed;
    use crate::services::catalog::{ReconcileError, ReconcileSummary, reconcile};

    const SVYAZNOY: &str = r#"
shop: Связной
categories:
  - id: 224
    name: Смартфоны
  - id: 15
    name: Аксессуары
goods:
  - id: 4216292
    category: 224
    model: apple/iphone/xs-max
    name: Смартфон Apple iPhone XS Max 512GB (золотистый)
    price: 110000
    price_rrc: 116990
    quantity: 14
    parameters:
      "Диагональ (дюйм)": 6.5
      "Встроенная память (Гб)": 512
      "Цвет": золотистый
  - id: 4216313
    category: 224
    model: apple/iphone/xs-max
    name: Смартфон Apple iPhone XS Max 256GB (серый космос)
    price: 94000
    price_rrc: 99990
    quantity: 7
    parameters:
      "Диагональ (дюйм)": 6.5
      "Встроенная память (Гб)": 256
      "Цвет": серый космос
  - id: 4672670
    category: 15
    model: cable
    name: Кабель USB-C
    price: 990
    price_rrc: 1200
    quantity: 30
    parameters: {}
"#;

    const DISJOINT: &str = r"
shop: Связной Маркет
categories:
  - id: 300
    name: Наушники
goods:
  - id: 9000001
    category: 300
    model: sony/wh-1000xm4
    name: Наушники Sony WH-1000XM4
    price: 25000
    price_rrc: 29990
    quantity: 3
    parameters:
      Цвет: черный
";

    fn seller(id: i32) -> SellerId {
        SellerId::new(UserId::new(id))
    }

    async fn ingest(
        store: &MemoryCatalog,
        seller: SellerId,
        doc: &str,
        policy: CategoryNamePolicy,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let feed = parse_feed(doc.as_bytes()).unwrap();
        let mut tx = store.begin().await;
        let summary = reconcile(
            &mut tx,
            seller,
            &feed,
            Some("https://example.com/feed.yaml"),
            policy,
        )
        .await?;
        tx.commit().await?;
        Ok(summary)
    }

    #[tokio::test]
    async fn test_ingestion_creates_shop_categories_and_listings() {
        let store = MemoryCatalog::default();
        let summary = ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        let (shop_id, shop) = state.shop_of(seller(1)).unwrap();
        assert_eq!(shop.name, "Связной");
        assert_eq!(shop.url.as_deref(), Some("https://example.com/feed.yaml"));
        assert_eq!(summary.shop_id, shop_id);

        for id in [224, 15] {
            let id = CategoryId::new(id);
            assert!(state.categories.contains_key(&id));
            assert!(state.category_shop.contains(&(id, shop_id)));
        }

        assert_eq!(state.external_ids(shop_id), vec![4_216_292, 4_216_313, 4_672_670]);
        let phone = state
            .listings
            .values()
            .find(|l| l.external_id == 4_216_292)
            .unwrap();
        assert_eq!(phone.model, "apple/iphone/xs-max");
        assert_eq!(phone.price, Decimal::new(110_000, 0));
        assert_eq!(phone.price_rrc, Decimal::new(116_990, 0));
        assert_eq!(phone.quantity, 14);
        assert_eq!(
            state.products[&phone.product],
            (
                "Смартфон Apple iPhone XS Max 512GB (золотистый)".to_string(),
                CategoryId::new(224)
            )
        );
        assert_eq!(summary.listings, 3);
        assert_eq!(summary.products_created, 3);
        assert_eq!(summary.parameters, 6);
        assert_eq!(state.parameters.len(), 3);
    }

    #[tokio::test]
    async fn test_same_feed_twice_reuses_products_and_parameters() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        let first = store.snapshot().await;

        let summary = ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        let second = store.snapshot().await;

        let (shop_id, _) = second.shop_of(seller(1)).unwrap();
        assert_eq!(first.external_ids(shop_id), second.external_ids(shop_id));
        assert_eq!(first.products, second.products);
        assert_eq!(first.parameters, second.parameters);
        assert_eq!(second.listing_parameters.len(), 6);
        assert_eq!(summary.products_created, 0);
        assert_eq!(summary.listings_removed, 3);
    }

    #[tokio::test]
    async fn test_disjoint_feed_replaces_listing_but_keeps_categories() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        ingest(&store, seller(1), DISJOINT, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        let (shop_id, shop) = state.shop_of(seller(1)).unwrap();
        assert_eq!(shop.name, "Связной Маркет");
        assert_eq!(state.external_ids(shop_id), vec![9_000_001]);
        assert_eq!(state.listing_parameters.len(), 1);

        for id in [224, 15, 300] {
            assert!(state.category_shop.contains(&(CategoryId::new(id), shop_id)));
        }
    }

    #[tokio::test]
    async fn test_failed_feed_leaves_previous_listing_untouched() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        let before = store.snapshot().await;

        let broken = r"
shop: Переименованный
categories:
  - id: 300
    name: Наушники
goods:
  - id: 1
    category: 300
    model: a
    name: Наушники A
    price: 1
    price_rrc: 1
    quantity: 1
    parameters: {}
  - id: 2
    category: 999
    model: b
    name: Нечто
    price: 1
    price_rrc: 1
    quantity: 1
    parameters: {}
";
        let err = ingest(&store, seller(1), broken, CategoryNamePolicy::Preserve)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::UnknownCategory { good: 2, .. }
        ));

        let after = store.snapshot().await;
        let (shop_id, shop) = after.shop_of(seller(1)).unwrap();
        assert_eq!(shop.name, "Связной");
        assert_eq!(after.external_ids(shop_id), before.external_ids(shop_id));
        assert!(!after.categories.contains_key(&CategoryId::new(300)));
    }

    #[tokio::test]
    async fn test_good_may_use_category_from_an_earlier_feed() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let doc = r"
shop: Другой
categories: []
goods:
  - id: 5
    category: 15
    model: case
    name: Чехол
    price: 500
    price_rrc: 700
    quantity: 2
    parameters: {}
";
        ingest(&store, seller(2), doc, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        let (shop_id, _) = state.shop_of(seller(2)).unwrap();
        assert_eq!(state.external_ids(shop_id), vec![5]);
    }

    #[tokio::test]
    async fn test_sellers_share_products() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        let summary = ingest(&store, seller(2), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        assert_eq!(summary.products_created, 0);
        assert_eq!(state.products.len(), 3);
        assert_eq!(state.shops.len(), 2);
        assert_eq!(state.listings.len(), 6);
    }

    const RENAMED_CATEGORY: &str = r"
shop: Связной
categories:
  - id: 224
    name: Телефоны
goods: []
";

    #[tokio::test]
    async fn test_preserve_policy_keeps_stored_category_name() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        ingest(&store, seller(1), RENAMED_CATEGORY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.categories[&CategoryId::new(224)], "Смартфоны");
    }

    #[tokio::test]
    async fn test_update_policy_renames_category() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Update)
            .await
            .unwrap();
        ingest(&store, seller(1), RENAMED_CATEGORY, CategoryNamePolicy::Update)
            .await
            .unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.categories[&CategoryId::new(224)], "Телефоны");
    }

    #[tokio::test]
    async fn test_reject_policy_fails_without_changes() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Reject)
            .await
            .unwrap();

        let err = ingest(&store, seller(1), RENAMED_CATEGORY, CategoryNamePolicy::Reject)
            .await
            .unwrap_err();
        match err {
            ReconcileError::CategoryNameConflict { id, stored, incoming } => {
                assert_eq!(id, CategoryId::new(224));
                assert_eq!(stored, "Смартфоны");
                assert_eq!(incoming, "Телефоны");
            }
            other => panic!("expected CategoryNameConflict, got {other:?}"),
        }

        let state = store.snapshot().await;
        let (shop_id, _) = state.shop_of(seller(1)).unwrap();
        assert_eq!(state.external_ids(shop_id).len(), 3);
    }

    #[tokio::test]
    async fn test_missing_url_keeps_stored_url() {
        let store = MemoryCatalog::default();
        ingest(&store, seller(1), SVYAZNOY, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let feed = parse_feed(DISJOINT.as_bytes()).unwrap();
        let mut tx = store.begin().await;
        reconcile(&mut tx, seller(1), &feed, None, CategoryNamePolicy::Preserve)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot().await;
        let (_, shop) = state.shop_of(seller(1)).unwrap();
        assert_eq!(shop.url.as_deref(), Some("https://example.com/feed.yaml"));
    }

    #[tokio::test]
    async fn test_shop_name_stored_as_written() {
        let store = MemoryCatalog::default();
        let doc = "shop: \" Связной Маркет \"\ncategories: []\ngoods: []\n";
        ingest(&store, seller(1), doc, CategoryNamePolicy::Preserve)
            .await
            .unwrap();

        let state = store.snapshot().await;
        let (_, shop) = state.shop_of(seller(1)).unwrap();
        assert_eq!(shop.name, " Связной Маркет ");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingestions_never_mix_listings() {
        let store = MemoryCatalog::default();

        let mut handles = Vec::new();
        for round in 0..8 {
            let store = store.clone();
            let doc = if round % 2 == 0 { SVYAZNOY } else { DISJOINT };
            handles.push(tokio::spawn(async move {
                ingest(&store, seller(1), doc, CategoryNamePolicy::Preserve).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let state = store.snapshot().await;
        let (shop_id, _) = state.shop_of(seller(1)).unwrap();
        let ids = state.external_ids(shop_id);
        assert!(
            ids == vec![4_216_292, 4_216_313, 4_672_670] || ids == vec![9_000_001],
            "mixed listing: {ids:?}"
        );
    }
}
