use std::sync::Arc;

use chrono::{Duration, Utc};

use super::codec::TokenClass;
use super::directory::Principal;
use super::issuer::{IssuedSession, TokenIssuer};
use super::validator::{SessionValidator, ValidatedSession};
use crate::error::AuthError;
use crate::session::SessionStore;

/// Refresh and logout.
///
/// A refresh token moves through validate, revoke, reissue. The old entry is
/// deleted before the new pair is written, so a failure in between leaves the
/// user logged out rather than holding two live sessions. Logout stops after
/// the revoke step.
pub struct SessionRotator {
    validator: Arc<SessionValidator>,
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn SessionStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionRotator {
    pub fn new(
        validator: Arc<SessionValidator>,
        issuer: Arc<TokenIssuer>,
        store: Arc<dyn SessionStore>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            validator,
            issuer,
            store,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Exchanges a live refresh token for a new pair.
    ///
    /// Only the caller whose delete actually removed the old entry gets a new
    /// pair; a concurrent rotation of the same token fails with
    /// `RevokedOrUnknownSession`.
    pub async fn rotate(&self, refresh_token: &str) -> Result<IssuedSession, AuthError> {
        let session = self.validated(refresh_token).await?;

        if !self.store.delete(&session.claims.jti).await? {
            return Err(AuthError::RevokedOrUnknownSession);
        }

        self.issuer
            .issue(&session.principal, self.access_ttl, self.refresh_ttl)
            .await
    }

    /// Revokes a live refresh token. Returns the principal it belonged to.
    pub async fn logout(&self, refresh_token: &str) -> Result<Principal, AuthError> {
        let session = self.validated(refresh_token).await?;
        self.store.delete(&session.claims.jti).await?;
        Ok(session.principal)
    }

    async fn validated(&self, refresh_token: &str) -> Result<ValidatedSession, AuthError> {
        self.validator
            .validate_at(refresh_token, TokenClass::Refresh, Utc::now())
            .await
    }
}
