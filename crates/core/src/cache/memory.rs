//! In-process response store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::handle::CacheHandle;
use crate::Error;

struct Entry {
    value: Vec<u8>,
    stored_at: Instant,
}

/// In-memory cache keyed by the full cache key.
///
/// Clones share the same map, so one instance can be handed to several
/// clients and inspected afterwards.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// Create an empty cache whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache whose entries expire `ttl` after being set.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: Arc::default(), ttl: Some(ttl) }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() > ttl)
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop entries past their TTL.
    pub async fn cleanup_expired(&self) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| ttl.is_none_or(|ttl| entry.stored_at.elapsed() <= ttl));
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheHandle for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, stored_at: Instant::now() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = MemoryCache::new();
        cache.set("k", b"old".to_vec()).await.unwrap();
        cache.set("k", b"new".to_vec()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = MemoryCache::new();
        let other = cache.clone();
        other.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(cache.keys().await, vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_entries_hidden_and_cleaned() {
        let cache = MemoryCache::with_ttl(Duration::from_millis(10));
        cache.set("k", b"v".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.len().await, 1);

        cache.cleanup_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_usable_through_arc_dyn() {
        let cache: Arc<dyn CacheHandle> = Arc::new(MemoryCache::new());
        cache.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
