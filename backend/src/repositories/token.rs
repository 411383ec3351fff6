//! Active access tokens, tracked by `jti` so logout and password changes can
//! revoke them before they expire.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::AppError;
use crate::types::UserId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// True while the token has neither been revoked nor expired.
    async fn is_active(&self, jti: &str) -> Result<bool, AppError>;

    async fn revoke(&self, jti: &str) -> Result<(), AppError>;

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AppError>;

    /// Drops expired rows; returns how many were removed.
    async fn delete_expired(&self) -> Result<u64, AppError>;
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO active_access_tokens (jti, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_active(&self, jti: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM active_access_tokens WHERE jti = $1 AND expires_at > NOW())",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn revoke(&self, jti: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM active_access_tokens WHERE jti = $1")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM active_access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM active_access_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
