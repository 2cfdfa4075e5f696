//! Query cache sitting in front of the content store.
//!
//! Keys are `"<entity>:..."` strings. A mutation calls [`QueryCache::invalidate`]
//! with the entity prefix, which drops both the cached lists and the cached
//! detail rows of that entity so the next read goes back to the database.
//!
//! Every invalidation also bumps a generation counter. A reader takes the
//! generation before querying the database and hands it back to
//! [`QueryCache::set`]; the write is dropped when an invalidation happened in
//! between, so rows loaded before a mutation never outlive it.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Pluggable cache backend. Values are serialized JSON documents.
#[async_trait]
pub trait QueryCache: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Option<String>;
    /// Current invalidation generation.
    async fn generation(&self) -> u64;
    /// Store `value` unless the cache was invalidated since `generation`.
    async fn set(&self, key: &str, value: String, generation: u64);
    /// Remove every entry whose key starts with `prefix`.
    async fn invalidate(&self, prefix: &str);
}

/// In-process cache backed by `DashMap`; entries expire after `ttl` and are
/// evicted lazily on access.
#[derive(Clone)]
pub struct InMemoryCache {
    inner: Arc<DashMap<String, (String, Instant)>>,
    /// Held for writing while an invalidation runs.
    generation: Arc<RwLock<u64>>,
    ttl: Duration,
}

impl InMemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            generation: Arc::new(RwLock::new(0)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl QueryCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.inner.get(key) {
            let (value, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(value.clone());
            }
            drop(entry);
            self.inner.remove(key);
        }
        None
    }

    async fn generation(&self) -> u64 {
        *self.generation.read().await
    }

    async fn set(&self, key: &str, value: String, generation: u64) {
        let current = self.generation.read().await;
        if *current != generation {
            tracing::debug!(key, "cache invalidated during load; not storing");
            return;
        }
        self.inner.insert(key.to_string(), (value, Instant::now()));
    }

    async fn invalidate(&self, prefix: &str) {
        let mut current = self.generation.write().await;
        *current += 1;
        self.inner.retain(|k, _| !k.starts_with(prefix));
    }
}

/// A cache that never stores anything. Useful to force every read through to the database.
#[derive(Clone, Copy, Default)]
pub struct NoCache;

#[async_trait]
impl QueryCache for NoCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn generation(&self) -> u64 {
        0
    }

    async fn set(&self, _key: &str, _value: String, _generation: u64) {}

    async fn invalidate(&self, _prefix: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hit_and_miss() {
        let cache = InMemoryCache::new(Duration::from_secs(60));
        cache.set("articles:list:all", "[]".to_string(), 0).await;
        assert_eq!(cache.get("articles:list:all").await.as_deref(), Some("[]"));
        assert_eq!(cache.get("articles:list:published").await, None);
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = InMemoryCache::new(Duration::from_millis(20));
        cache.set("k", "v".to_string(), 0).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_drops_only_matching_prefix() {
        let cache = InMemoryCache::new(Duration::from_secs(60));
        cache.set("articles:list:all", "a".to_string(), 0).await;
        cache.set("articles:5b1c", "b".to_string(), 0).await;
        cache.set("companies:list:all", "c".to_string(), 0).await;

        cache.invalidate("articles:").await;

        assert_eq!(cache.get("articles:list:all").await, None);
        assert_eq!(cache.get("articles:5b1c").await, None);
        assert_eq!(cache.get("companies:list:all").await.as_deref(), Some("c"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn set_after_invalidation_is_dropped() {
        let cache = InMemoryCache::new(Duration::from_secs(60));
        let before = cache.generation().await;

        cache.invalidate("articles:").await;
        cache.set("articles:list:all", "old".to_string(), before).await;
        assert_eq!(cache.get("articles:list:all").await, None);

        let now = cache.generation().await;
        assert_eq!(now, before + 1);
        cache.set("articles:list:all", "new".to_string(), now).await;
        assert_eq!(cache.get("articles:list:all").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn no_cache_never_hits() {
        let cache = NoCache;
        cache.set("k", "v".to_string(), 0).await;
        assert_eq!(cache.get("k").await, None);
    }
}
