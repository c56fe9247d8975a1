use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{SessionStore, StoreError};

#[derive(Debug)]
struct SessionEntry {
    user_id: String,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process session store.
///
/// Expiry is measured on the tokio clock, so tests running with paused time
/// can move entries past their TTL with `tokio::time::advance`.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token_id: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = ttl
            .to_std()
            .ok()
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| Instant::now().checked_add(ttl))
            .ok_or_else(|| StoreError::InvalidTtl(ttl.to_string()))?;

        let entry = SessionEntry {
            user_id: user_id.to_string(),
            expires_at,
        };
        self.entries.write().await.insert(token_id.to_string(), entry);
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<String, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(token_id) {
            Some(entry) if entry.is_live(Instant::now()) => Ok(entry.user_id.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, token_id: &str) -> Result<bool, StoreError> {
        let removed = self.entries.write().await.remove(token_id);
        Ok(removed.map_or(false, |entry| entry.is_live(Instant::now())))
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok((before - entries.len()) as u64)
    }
}
