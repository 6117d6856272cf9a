//! Basket and order lifecycle against a real `PostgreSQL` database.
//!
//! Run with: cargo test -p bazaar-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use bazaar_api::db::{CatalogRepository, OrderRepository, Pagination, ProductFilter, ShopRepository};
use bazaar_api::services::catalog::import_feed;
use bazaar_api::services::orders::{
    self, BasketQuantity, NewBasketItem, OrderError,
};
use bazaar_core::{CategoryNamePolicy, OrderState, ProductInfoId, SellerId, UserId, UserKind};
use bazaar_integration_tests::{SHOP_FEED, create_seller, create_user};
use rust_decimal::Decimal;
use sqlx::PgPool;

async fn setup(pool: &PgPool) -> (SellerId, UserId, Vec<ProductInfoId>) {
    let seller = create_seller(pool, "seller@example.com").await;
    import_feed(pool, seller, SHOP_FEED.as_bytes(), None, CategoryNamePolicy::Preserve)
        .await
        .unwrap();
    let buyer = create_user(pool, "buyer@example.com", UserKind::Buyer).await;

    let listings = CatalogRepository::new(pool)
        .list_product_infos(
            &ProductFilter::default(),
            Pagination {
                limit: 10,
                offset: 0,
            },
        )
        .await
        .unwrap()
        .results
        .into_iter()
        .map(|p| p.id)
        .collect();

    (seller, buyer, listings)
}

fn item(product_info: ProductInfoId, quantity: i32) -> NewBasketItem {
    NewBasketItem {
        product_info,
        quantity,
    }
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_adding_twice_sums_quantity(pool: PgPool) {
    let (_, buyer, listings) = setup(&pool).await;

    orders::add_to_basket(&pool, buyer, &[item(listings[0], 1)]).await.unwrap();
    orders::add_to_basket(&pool, buyer, &[item(listings[0], 2)]).await.unwrap();

    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();
    assert_eq!(basket.state, OrderState::Basket);
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 3);
    assert_eq!(basket.total_sum, basket.items[0].price * Decimal::from(3));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_listing_adds_nothing(pool: PgPool) {
    let (_, buyer, listings) = setup(&pool).await;

    let err = orders::add_to_basket(
        &pool,
        buyer,
        &[item(listings[0], 1), item(ProductInfoId::new(999_999), 1)],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, OrderError::ListingUnavailable(_)));

    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap();
    assert!(basket.is_none_or(|b| b.items.is_empty()));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_update_and_remove_items(pool: PgPool) {
    let (_, buyer, listings) = setup(&pool).await;
    orders::add_to_basket(&pool, buyer, &[item(listings[0], 1), item(listings[1], 1)])
        .await
        .unwrap();

    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();
    let first = basket.items[0].id;
    let second = basket.items[1].id;

    let updated = orders::update_basket(
        &pool,
        buyer,
        &[BasketQuantity {
            id: first,
            quantity: 5,
        }],
    )
    .await
    .unwrap();
    assert_eq!(updated, 1);

    let deleted = orders::remove_from_basket(&pool, buyer, &[second]).await.unwrap();
    assert_eq!(deleted, 1);

    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 5);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_place_order_and_partner_view(pool: PgPool) {
    let (seller, buyer, listings) = setup(&pool).await;
    orders::add_to_basket(&pool, buyer, &[item(listings[0], 2)]).await.unwrap();
    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();

    orders::place_order(&pool, buyer, basket.id).await.unwrap();

    let repo = OrderRepository::new(&pool);
    assert!(repo.basket(buyer).await.unwrap().is_none());

    let placed = repo.placed_orders(buyer).await.unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].state, OrderState::New);

    let shop = ShopRepository::new(&pool).get_by_seller(seller).await.unwrap().unwrap();
    let partner = repo.partner_orders(shop.id).await.unwrap();
    assert_eq!(partner.len(), 1);
    assert!(partner[0].items.iter().all(|i| i.shop_id == shop.id));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_place_rejects_foreign_and_empty_baskets(pool: PgPool) {
    let (_, buyer, listings) = setup(&pool).await;
    let other = create_user(&pool, "other@example.com", UserKind::Buyer).await;

    orders::add_to_basket(&pool, buyer, &[item(listings[0], 1)]).await.unwrap();
    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();

    let err = orders::place_order(&pool, other, basket.id).await.unwrap_err();
    assert!(matches!(err, OrderError::BasketNotFound(_)));

    orders::remove_from_basket(&pool, buyer, &[basket.items[0].id])
        .await
        .unwrap();
    let err = orders::place_order(&pool, buyer, basket.id).await.unwrap_err();
    assert!(matches!(err, OrderError::EmptyBasket));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_reingestion_makes_basket_items_stale(pool: PgPool) {
    let (seller, buyer, listings) = setup(&pool).await;
    orders::add_to_basket(&pool, buyer, &[item(listings[0], 1)]).await.unwrap();

    import_feed(&pool, seller, SHOP_FEED.as_bytes(), None, CategoryNamePolicy::Preserve)
        .await
        .unwrap();

    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();
    assert_eq!(basket.items[0].product_info, None);

    let err = orders::place_order(&pool, buyer, basket.id).await.unwrap_err();
    assert!(matches!(err, OrderError::StaleItems));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_closed_shop_blocks_order(pool: PgPool) {
    let (seller, buyer, listings) = setup(&pool).await;
    orders::add_to_basket(&pool, buyer, &[item(listings[0], 1)]).await.unwrap();
    let basket = OrderRepository::new(&pool).basket(buyer).await.unwrap().unwrap();

    ShopRepository::new(&pool).set_state(seller, false).await.unwrap();

    let err = orders::place_order(&pool, buyer, basket.id).await.unwrap_err();
    assert!(matches!(err, OrderError::ShopClosed));
}
