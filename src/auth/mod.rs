//! Authentication module
//!
//! Token issuance, validation, rotation and revocation, plus the HTTP
//! handlers and the service tying them to the user directory.

mod codec;
mod directory;
mod issuer;
mod rotator;
mod service;
mod validator;
pub mod handlers;

pub use codec::{CodecError, TokenClaims, TokenClass, TokenCodec, TokenSecrets, TOKEN_ALGORITHM};
pub use directory::{NewUser, Principal, UserDirectory};
#[cfg(test)]
pub use directory::MockUserDirectory;
pub use issuer::{IssuedSession, TokenIssuer, TokenPair};
pub use rotator::SessionRotator;
pub use service::AuthService;
pub use validator::{SessionValidator, ValidatedSession};

use chrono::Duration;

/// Secrets and TTLs for both token classes, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secrets: TokenSecrets,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}
