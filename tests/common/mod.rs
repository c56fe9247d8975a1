#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use authgate::auth::{AuthService, NewUser, Principal, SessionConfig, TokenSecrets, UserDirectory};
use authgate::error::{AuthError, DatabaseError};
use authgate::MemorySessionStore;
use chrono::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const ACCESS_SECRET: &str = "test-access-secret";
pub const REFRESH_SECRET: &str = "test-refresh-secret";

/// User directory kept in memory, with plaintext passwords.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, (Principal, String)>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, principal: Principal, password: &str) {
        self.users
            .write()
            .await
            .insert(principal.id.clone(), (principal, password.to_string()));
    }

    pub async fn remove(&self, id: &str) {
        self.users.write().await.remove(id);
    }

    async fn find(&self, matches: impl Fn(&Principal) -> bool) -> Option<Principal> {
        self.users
            .read()
            .await
            .values()
            .find(|(p, _)| matches(p))
            .map(|(p, _)| p.clone())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, DatabaseError> {
        Ok(self.users.read().await.get(id).map(|(p, _)| p.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DatabaseError> {
        Ok(self.find(|p| p.email == email).await)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, DatabaseError> {
        Ok(self.find(|p| p.username == username).await)
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<Principal, AuthError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(AuthError::DuplicateRegistration("email".into()));
        }
        if self.find_by_username(&new_user.username).await?.is_some() {
            return Err(AuthError::DuplicateRegistration("username".into()));
        }
        let principal = Principal {
            id: Uuid::new_v4().to_string(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
        };
        self.insert(principal.clone(), &new_user.password).await;
        Ok(principal)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.users
            .read()
            .await
            .values()
            .find(|(p, stored)| p.email == email && stored == password)
            .map(|(p, _)| p.clone())
            .ok_or(AuthError::InvalidCredentials)
    }
}

pub fn principal(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        username: format!("user-{}", id),
        email: format!("{}@example.com", id),
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        secrets: TokenSecrets::new(ACCESS_SECRET, REFRESH_SECRET),
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(7),
    }
}

pub struct Harness {
    pub store: Arc<MemorySessionStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub service: AuthService,
}

pub async fn harness() -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    directory.insert(principal("u1"), "password123").await;
    let service = AuthService::new(session_config(), store.clone(), directory.clone());
    Harness {
        store,
        directory,
        service,
    }
}
