use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::codec::{TokenClaims, TokenClass, TokenCodec, TokenSecrets};
use super::directory::Principal;
use crate::error::AuthError;
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// A freshly issued token pair, with what the transport layer needs to hand
/// it out.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub principal: Principal,
    pub tokens: TokenPair,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

struct SignedToken {
    token_id: String,
    token: String,
}

pub struct TokenIssuer {
    codec: TokenCodec,
    secrets: TokenSecrets,
    store: Arc<dyn SessionStore>,
}

impl TokenIssuer {
    pub fn new(codec: TokenCodec, secrets: TokenSecrets, store: Arc<dyn SessionStore>) -> Self {
        Self {
            codec,
            secrets,
            store,
        }
    }

    /// Issues an access/refresh pair for `principal` and records both token
    /// ids as live sessions, each with its own TTL.
    ///
    /// If recording the refresh token fails, the access token entry is
    /// removed again before the error is returned.
    pub async fn issue(
        &self,
        principal: &Principal,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<IssuedSession, AuthError> {
        let now = Utc::now();
        let access = self.sign(principal, TokenClass::Access, now, access_ttl)?;
        let refresh = self.sign(principal, TokenClass::Refresh, now, refresh_ttl)?;

        self.store
            .put(&access.token_id, &principal.id, access_ttl)
            .await?;

        if let Err(e) = self
            .store
            .put(&refresh.token_id, &principal.id, refresh_ttl)
            .await
        {
            if let Err(rollback) = self.store.delete(&access.token_id).await {
                warn!(
                    "Failed to roll back access session for user {}: {}",
                    principal.id, rollback
                );
            }
            return Err(e.into());
        }

        Ok(IssuedSession {
            principal: principal.clone(),
            tokens: TokenPair {
                access_token: access.token,
                refresh_token: refresh.token,
            },
            access_ttl,
            refresh_ttl,
        })
    }

    fn sign(
        &self,
        principal: &Principal,
        class: TokenClass,
        issued_at: chrono::DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SignedToken, AuthError> {
        let token_id = Uuid::new_v4().to_string();
        let claims = TokenClaims::new(principal, token_id.clone(), issued_at, ttl)?;
        let token = self.codec.issue(&claims, self.secrets.secret(class))?;
        Ok(SignedToken { token_id, token })
    }
}
