use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, DatabaseError};

/// The authenticated identity a token stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// User lookup and registration, implemented by the user storage layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, DatabaseError>;

    /// Fails with `AuthError::DuplicateRegistration` naming the clashing field.
    async fn create_user(&self, new_user: &NewUser) -> Result<Principal, AuthError>;

    /// Fails with `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password alike.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Principal, AuthError>;
}
