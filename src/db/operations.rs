use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::UserRecord;
use super::password::{hash_password, verify_password};
use crate::auth::{NewUser, Principal, UserDirectory};
use crate::error::{AppError, AuthError, DatabaseError};

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at, updated_at";

/// Postgres-backed user directory.
#[derive(Clone)]
pub struct UserStore {
    pool: Arc<PgPool>,
}

impl UserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(pool)
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>, DatabaseError> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(value)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_record_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn create_user_with_transaction(
        &self,
        user: &UserRecord,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<UserRecord, AuthError> {
        let clash: Option<(String, String)> = sqlx::query_as(
            "SELECT email, username FROM users WHERE email = $1 OR username = $2 LIMIT 1",
        )
        .bind(&user.email)
        .bind(&user.username)
        .fetch_optional(&mut **transaction)
        .await
        .map_err(DatabaseError::from)?;

        if let Some((email, _)) = clash {
            let field = if email == user.email { "email" } else { "username" };
            return Err(AuthError::DuplicateRegistration(field.into()));
        }

        let query = format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&mut **transaction)
            .await
            .map_err(|e| match DatabaseError::from(e) {
                // lost a race with a concurrent registration
                DatabaseError::Duplicate => AuthError::DuplicateRegistration("email or username".into()),
                other => AuthError::Directory(other),
            })?;

        Ok(created)
    }
}

async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Directory(DatabaseError::QueryError(e.to_string())))
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, DatabaseError> {
        let id = match Uuid::parse_str(id) {
            Ok(id) => id,
            Err(_) => return Ok(None),
        };
        Ok(self.find_record_by_id(id).await?.map(|u| u.principal()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError> {
        Ok(self.find_one("email", email).await?.map(|u| u.principal()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, DatabaseError> {
        Ok(self.find_one("username", username).await?.map(|u| u.principal()))
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<Principal, AuthError> {
        let password = new_user.password.clone();
        let password_hash = blocking(move || hash_password(&password))
            .await?
            .map_err(|e| AuthError::Directory(DatabaseError::QueryError(e.to_string())))?;

        let user = UserRecord::new(
            new_user.email.trim().to_string(),
            new_user.username.trim().to_string(),
            password_hash,
        );

        let mut transaction = self.begin_transaction().await?;
        let result = self.create_user_with_transaction(&user, &mut transaction).await;

        match result {
            Ok(user) => {
                transaction.commit().await.map_err(DatabaseError::from)?;
                Ok(user.principal())
            }
            Err(e) => {
                transaction.rollback().await.map_err(DatabaseError::from)?;
                Err(e)
            }
        }
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let user = self
            .find_one("email", email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        if blocking(move || verify_password(&password, &hash)).await? {
            Ok(user.principal())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
