//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, SellerId, UserId, UserKind};

/// A marketplace account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub kind: UserKind,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub kind: UserKind,
}

impl CurrentUser {
    /// The seller identity of this user, if they are a shop account.
    #[must_use]
    pub fn seller_id(&self) -> Option<SellerId> {
        (self.kind == UserKind::Shop).then(|| SellerId::new(self.id))
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            kind: user.kind,
        }
    }
}
