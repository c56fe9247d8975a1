use std::collections::HashSet;
use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::directory::Principal;

/// The only signing algorithm tokens are issued with or accepted under.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;
const TOKEN_ALGORITHM_NAME: &str = "HS256";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Token lifetime out of range: {0}")]
    LifetimeOutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Access,
    Refresh,
}

/// Signing secrets, one per token class.
#[derive(Clone)]
pub struct TokenSecrets {
    access: String,
    refresh: String,
}

impl TokenSecrets {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    pub fn secret(&self, class: TokenClass) -> &str {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }
}

impl fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub jti: String,  // Token id, the session store key
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
    pub iss: String,  // Issuer, the user id
}

impl TokenClaims {
    pub fn new(
        principal: &Principal,
        token_id: String,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, CodecError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| CodecError::LifetimeOutOfRange(ttl.to_string()))?;

        Ok(Self {
            user_id: principal.id.clone(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            jti: token_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: principal.id.clone(),
        })
    }

    /// A token is still good during its `exp` second.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }
}

/// Signs and verifies claims. Expiry is not checked here; callers compare
/// `exp` against their own clock.
#[derive(Clone)]
pub struct TokenCodec {
    header: Header,
    validation: Validation,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCodec {
    pub fn new() -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            header: Header::new(TOKEN_ALGORITHM),
            validation,
        }
    }

    pub fn issue(&self, claims: &TokenClaims, secret: &str) -> Result<String, CodecError> {
        encode(&self.header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| CodecError::Encoding(e.to_string()))
    }

    pub fn parse(&self, token: &str, secret: &str) -> Result<TokenClaims, CodecError> {
        let algorithm = declared_algorithm(token)?;
        if algorithm != TOKEN_ALGORITHM_NAME {
            return Err(CodecError::UnsupportedAlgorithm(algorithm));
        }

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &self.validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => CodecError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => CodecError::UnsupportedAlgorithm(algorithm.clone()),
            _ => CodecError::MalformedToken(e.to_string()),
        })?;

        Ok(data.claims)
    }
}

/// Reads `alg` from the token header without trusting anything else in it.
fn declared_algorithm(token: &str) -> Result<String, CodecError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(CodecError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let header = URL_SAFE_NO_PAD
        .decode(parts[0])
        .map_err(|e| CodecError::MalformedToken(e.to_string()))?;
    let header: serde_json::Value =
        serde_json::from_slice(&header).map_err(|e| CodecError::MalformedToken(e.to_string()))?;

    header
        .get("alg")
        .and_then(|alg| alg.as_str())
        .map(str::to_owned)
        .ok_or_else(|| CodecError::MalformedToken("missing alg header".into()))
}
