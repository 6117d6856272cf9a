//! Offline feed import.
//!
//! ```bash
//! bazaar-cli import -e seller@example.com -f shop1.yaml --policy update
//! ```
//!
//! Runs the same parser and reconciler as `POST /seller/update`, reading the
//! feed from a local file instead of a URL.

use bazaar_api::db::UserRepository;
use bazaar_api::services::catalog;
use bazaar_core::{CategoryNamePolicy, Email, SellerId, UserKind};

use super::{CommandError, connect};

/// Replace a seller's catalog with the feed in `path`.
pub async fn run(email: &str, path: &str, policy: Option<&str>) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let policy = policy
        .map(str::parse::<CategoryNamePolicy>)
        .transpose()
        .map_err(CommandError::InvalidArgument)?
        .unwrap_or_default();

    let body = tokio::fs::read(path)
        .await
        .map_err(|source| CommandError::ReadFile {
            path: path.to_owned(),
            source,
        })?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::InvalidArgument(format!("no account for {email}")))?;
    if user.kind != UserKind::Shop {
        return Err(CommandError::InvalidArgument(format!(
            "{email} is not a shop account"
        )));
    }

    let summary =
        catalog::import_feed(&pool, SellerId::new(user.id), &body, None, policy).await?;

    tracing::info!(
        shop_id = %summary.shop_id,
        categories = summary.categories,
        listings = summary.listings,
        removed = summary.listings_removed,
        "Imported {path}"
    );
    Ok(())
}
