use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::codec::{TokenClaims, TokenClass, TokenCodec, TokenSecrets};
use super::directory::{Principal, UserDirectory};
use crate::error::AuthError;
use crate::session::SessionStore;

/// A token that passed every check, with the claims it carried.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub principal: Principal,
    pub claims: TokenClaims,
}

pub struct SessionValidator {
    codec: TokenCodec,
    secrets: TokenSecrets,
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn UserDirectory>,
}

impl SessionValidator {
    pub fn new(
        codec: TokenCodec,
        secrets: TokenSecrets,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            codec,
            secrets,
            store,
            directory,
        }
    }

    /// Resolves a presented token of the given class to its live principal.
    pub async fn validate(&self, token: &str, class: TokenClass) -> Result<Principal, AuthError> {
        self.validate_at(token, class, Utc::now())
            .await
            .map(|session| session.principal)
    }

    /// Runs the checks in order, each with its own failure:
    /// signature and algorithm, session presence, principal existence, and
    /// finally the embedded expiry against `now`.
    ///
    /// Expiry is checked last and separately from the store TTL, so a token
    /// whose entry outlives its `exp` is still rejected.
    pub async fn validate_at(
        &self,
        token: &str,
        class: TokenClass,
        now: DateTime<Utc>,
    ) -> Result<ValidatedSession, AuthError> {
        let claims = self.codec.parse(token, self.secrets.secret(class))?;

        let user_id = self.store.get(&claims.jti).await?;
        if user_id != claims.user_id {
            return Err(AuthError::RevokedOrUnknownSession);
        }

        let principal = self
            .directory
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if claims.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }

        Ok(ValidatedSession { principal, claims })
    }
}
