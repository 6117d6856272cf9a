//! Account management commands.
//!
//! ```bash
//! # Create a seller account and print its first token
//! bazaar-cli user create -e seller@example.com -k shop
//!
//! # Issue another token for an existing account
//! bazaar-cli user token -e seller@example.com
//! ```
//!
//! Tokens are printed once and only their hash is stored.

use bazaar_api::services::auth::AuthService;
use bazaar_core::UserKind;

use super::{CommandError, connect};

/// Create an account and print its token.
pub async fn create(email: &str, kind: &str) -> Result<(), CommandError> {
    let kind: UserKind = kind.parse().map_err(CommandError::InvalidArgument)?;
    let pool = connect().await?;

    let (user, token) = AuthService::new(&pool).register(email, kind).await?;
    tracing::info!(user_id = %user.id, kind = %user.kind, "Created user {}", user.email);

    print_token(&token);
    Ok(())
}

/// Issue and print an additional token.
pub async fn token(email: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let token = AuthService::new(&pool).issue_token(email).await?;
    tracing::info!("Issued token for {email}");

    print_token(&token);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_token(token: &str) {
    println!("{token}");
}
