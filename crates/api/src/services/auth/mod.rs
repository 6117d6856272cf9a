//! Authentication service.
//!
//! Callers authenticate with opaque API tokens. A token is 32 random bytes,
//! URL-safe base64 encoded; only its SHA-256 digest is stored.

mod error;

pub use error::AuthError;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use bazaar_core::{Email, UserKind};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{CurrentUser, User};

/// Number of random bytes in an API token.
const TOKEN_BYTES: usize = 32;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an account and issue its first token.
    ///
    /// Returns the user and the plaintext token, which is not stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(
        &self,
        email: &str,
        kind: UserKind,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;

        let user = self.users.create(&email, kind).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        let token = self.issue_token_for(&user).await?;
        tracing::info!(user_id = %user.id, kind = %user.kind, "User registered");

        Ok((user, token))
    }

    /// Issue an additional token for an existing account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account has this email.
    pub async fn issue_token(&self, email: &str) -> Result<String, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.issue_token_for(&user).await
    }

    /// Resolve a presented token to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let user = self
            .users
            .get_by_token_hash(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(user.into())
    }

    async fn issue_token_for(&self, user: &User) -> Result<String, AuthError> {
        let token = generate_token();
        self.users.create_token(user.id, &hash_token(&token)).await?;
        Ok(token)
    }
}

/// Generate a new random token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 digest of a token, as stored in `api_token.token_hash`.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
