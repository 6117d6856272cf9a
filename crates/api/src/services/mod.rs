//! Business logic services.
//!
//! - `auth` - API token issue and lookup
//! - `catalog` - Seller feed reconciliation
//! - `orders` - Basket changes and order placement

pub mod auth;
pub mod catalog;
pub mod orders;
