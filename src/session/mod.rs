//! Session store module
//!
//! Maps a token id to the id of the user owning it, with a per-key TTL.
//! An entry exists exactly as long as the token is live: revoking a token
//! means deleting its entry, and expiry is left to the store.

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found")]
    NotFound,

    #[error("Invalid session TTL: {0}")]
    InvalidTtl(String),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store for live sessions, shared by every request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `token_id -> user_id`, expiring after `ttl`.
    async fn put(&self, token_id: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns the user id owning `token_id`, or `StoreError::NotFound` once
    /// the entry was deleted or has expired.
    async fn get(&self, token_id: &str) -> Result<String, StoreError>;

    /// Deletes the entry. Returns whether a live entry was removed; deleting
    /// a missing key is not an error.
    async fn delete(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
