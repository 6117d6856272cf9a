//! Status enums for accounts and orders.

use serde::{Deserialize, Serialize};

/// Kind of account. Only `Shop` accounts may own a shop and upload feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.user_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    /// A seller that owns exactly one shop.
    Shop,
    /// A regular customer.
    #[default]
    Buyer,
}

impl std::fmt::Display for UserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shop => write!(f, "shop"),
            Self::Buyer => write!(f, "buyer"),
        }
    }
}

impl std::str::FromStr for UserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shop" => Ok(Self::Shop),
            "buyer" => Ok(Self::Buyer),
            _ => Err(format!("invalid user kind: {s}")),
        }
    }
}

/// Lifecycle state of an order.
///
/// Every buyer has at most one order in the `Basket` state. Confirming the
/// basket moves it to `New`; the remaining states are driven by the shops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.order_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[default]
    Basket,
    New,
    Confirmed,
    Assembled,
    Sent,
    Delivered,
    Canceled,
}

impl OrderState {
    /// Whether the order has left the basket and is visible to shops.
    #[must_use]
    pub const fn is_placed(self) -> bool {
        !matches!(self, Self::Basket)
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Basket => "basket",
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Assembled => "assembled",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        };
        f.write_str(s)
    }
}
