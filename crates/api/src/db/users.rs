//! User and API token repository.

use sqlx::PgPool;

use bazaar_core::{Email, UserId, UserKind};

use super::RepositoryError;
use crate::models::User;

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, kind, created_at
            FROM bazaar.user
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, email: &Email, kind: UserKind) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r"
            INSERT INTO bazaar.user (email, kind)
            VALUES ($1, $2)
            RETURNING id, email, kind, created_at
            ",
        )
        .bind(email)
        .bind(kind)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "email already exists"))
    }

    /// Store the hash of a newly issued API token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_token(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.api_token (token_hash, user_id)
            VALUES ($1, $2)
            ",
        )
        .bind(token_hash)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "token already exists"))?;

        Ok(())
    }

    /// Resolve a token hash to its user, recording the time of use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            WITH touched AS (
                UPDATE bazaar.api_token
                SET last_used_at = NOW()
                WHERE token_hash = $1
                RETURNING user_id
            )
            SELECT u.id, u.email, u.kind, u.created_at
            FROM bazaar.user u
            JOIN touched t ON t.user_id = u.id
            ",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }
}
