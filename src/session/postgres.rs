use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use super::{SessionStore, StoreError};

/// Session store backed by the `sessions` table.
///
/// Rows past `expires_at` are treated as absent; `purge_expired` removes them.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: Arc<PgPool>,
}

impl PgSessionStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, token_id: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl <= Duration::zero() {
            return Err(StoreError::InvalidTtl(ttl.to_string()));
        }
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::InvalidTtl(ttl.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (token_id, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token_id)
            DO UPDATE SET user_id = EXCLUDED.user_id, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token_id)
        .bind(user_id)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM sessions WHERE token_id = $1 AND expires_at > $2",
        )
        .bind(token_id)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(unavailable)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, token_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_id = $1 AND expires_at > $2")
            .bind(token_id)
            .bind(Utc::now())
            .execute(self.pool.as_ref())
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut transaction = self.pool.begin().await.map_err(unavailable)?;

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&mut *transaction)
            .await;

        match result {
            Ok(result) => {
                transaction.commit().await.map_err(unavailable)?;
                Ok(result.rows_affected())
            }
            Err(e) => {
                transaction.rollback().await.map_err(unavailable)?;
                Err(unavailable(e))
            }
        }
    }
}
