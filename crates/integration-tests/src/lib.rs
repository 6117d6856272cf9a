//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # Database tests (sqlx creates a scratch database per test)
//! DATABASE_URL=postgres://localhost/bazaar cargo test -p bazaar-integration-tests -- --ignored
//!
//! # HTTP smoke tests also need a running server
//! BAZAAR_API_URL=http://localhost:8000 cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Test Files
//!
//! - `catalog_ingestion` - Feed reconciliation against `PostgreSQL`
//! - `basket_orders` - Basket and order lifecycle against `PostgreSQL`
//! - `api_smoke` - Response shapes of a running server

use bazaar_api::db::UserRepository;
use bazaar_core::{Email, SellerId, UserId, UserKind};
use sqlx::PgPool;

/// A feed with two categories and two goods.
pub const SHOP_FEED: &str = r#"
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
      "Цвет": золотистый
  - id: 4672670
    category: 15
    model: cable
    name: Кабель USB-C
    price: 990
    price_rrc: 1200
    quantity: 300
    parameters: {}
"#;

/// Create a seller account.
///
/// # Panics
///
/// Panics if the account cannot be created.
pub async fn create_seller(pool: &PgPool, email: &str) -> SellerId {
    SellerId::new(create_user(pool, email, UserKind::Shop).await)
}

/// Create an account of any kind.
///
/// # Panics
///
/// Panics if the account cannot be created.
pub async fn create_user(pool: &PgPool, email: &str, kind: UserKind) -> UserId {
    let email = Email::parse(email).expect("valid test email");
    UserRepository::new(pool)
        .create(&email, kind)
        .await
        .expect("create test user")
        .id
}
