use std::sync::Arc;

use tracing::{info, warn};

use super::codec::{TokenClass, TokenCodec};
use super::directory::{NewUser, Principal, UserDirectory};
use super::issuer::{IssuedSession, TokenIssuer};
use super::rotator::SessionRotator;
use super::validator::SessionValidator;
use super::SessionConfig;
use crate::error::AppError;
use crate::session::SessionStore;

const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthService {
    config: SessionConfig,
    directory: Arc<dyn UserDirectory>,
    issuer: Arc<TokenIssuer>,
    validator: Arc<SessionValidator>,
    rotator: SessionRotator,
}

impl AuthService {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let codec = TokenCodec::new();
        let issuer = Arc::new(TokenIssuer::new(
            codec.clone(),
            config.secrets.clone(),
            store.clone(),
        ));
        let validator = Arc::new(SessionValidator::new(
            codec,
            config.secrets.clone(),
            store.clone(),
            directory.clone(),
        ));
        let rotator = SessionRotator::new(
            validator.clone(),
            issuer.clone(),
            store,
            config.access_ttl,
            config.refresh_ttl,
        );

        Self {
            config,
            directory,
            issuer,
            validator,
            rotator,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn register(&self, new_user: &NewUser) -> Result<Principal, AppError> {
        validate_registration(new_user)?;

        let principal = self.directory.create_user(new_user).await.map_err(|e| {
            warn!("Registration failed for {}: {}", new_user.email, e);
            e
        })?;

        info!("Registered user {}", principal.id);
        Ok(principal)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let principal = self
            .directory
            .verify_credentials(email, password)
            .await
            .map_err(|e| {
                warn!("Login failed for {}: {}", email, e);
                e
            })?;

        let issued = self
            .issuer
            .issue(&principal, self.config.access_ttl, self.config.refresh_ttl)
            .await?;

        info!("Issued session for user {}", principal.id);
        Ok(issued)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedSession, AppError> {
        let issued = self.rotator.rotate(refresh_token).await.map_err(|e| {
            warn!("Token refresh rejected: {}", e);
            e
        })?;

        info!("Rotated session for user {}", issued.principal.id);
        Ok(issued)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<Principal, AppError> {
        let principal = self.rotator.logout(refresh_token).await.map_err(|e| {
            warn!("Logout rejected: {}", e);
            e
        })?;

        info!("Logged out user {}", principal.id);
        Ok(principal)
    }

    /// Resolves an access token to its principal.
    pub async fn authenticate(&self, access_token: &str) -> Result<Principal, AppError> {
        Ok(self
            .validator
            .validate(access_token, TokenClass::Access)
            .await?)
    }
}

fn validate_registration(new_user: &NewUser) -> Result<(), AppError> {
    if new_user.username.trim().is_empty() {
        return Err(AppError::ValidationError("username must not be empty".into()));
    }
    let email = new_user.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::ValidationError("email address is invalid".into()));
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
