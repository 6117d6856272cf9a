//! Domain and response types.
//!
//! Row types used only by a single query stay private to their repository;
//! the types here cross layer boundaries or are serialized to clients.

pub mod catalog;
pub mod order;
pub mod user;

use serde::Serialize;

pub use catalog::{Category, ProductInfoView, ProductParameterView, Shop};
pub use order::{OrderItemView, OrderView};
pub use user::{CurrentUser, User};

/// A page of list results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Total number of matching rows, ignoring pagination.
    pub count: i64,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(count: i64, results: Vec<T>) -> Self {
        Self { count, results }
    }
}
