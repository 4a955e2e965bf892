//! Key-value store abstraction and the in-process backend.

use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;
use tracing::warn;

use super::config::CacheConfig;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Operations the cache layer needs from a key-value store.
///
/// Values are opaque strings (serialized JSON snapshots). `ttl = None` keeps
/// the entry until it is deleted.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError>;

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>)
    -> Result<(), CacheStoreError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheStoreError>;

    /// Deletes every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError>;

    async fn flush(&self) -> Result<(), CacheStoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process LRU backend. Expired entries are dropped lazily on access.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.memory_capacity_non_zero())),
        }
    }

    // LRU reads reorder entries, so every access takes the write side.
    fn entries_mut(
        &self,
        op: &'static str,
    ) -> RwLockWriteGuard<'_, LruCache<String, MemoryEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!(op, source = SOURCE, "memory cache lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries_mut("len");
        purge_expired(&mut entries, now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn purge_expired(entries: &mut LruCache<String, MemoryEntry>, now: Instant) {
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in expired {
        entries.pop(&key);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError> {
        let now = Instant::now();
        let mut entries = self.entries_mut("exists");
        match entries.peek(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheStoreError> {
        let now = Instant::now();
        let mut entries = self.entries_mut("get");
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheStoreError> {
        let entry = MemoryEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries_mut("set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheStoreError> {
        let mut entries = self.entries_mut("delete");
        for key in keys {
            entries.pop(key);
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheStoreError> {
        let mut entries = self.entries_mut("delete_prefix");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        Ok(matching.len() as u64)
    }

    async fn flush(&self) -> Result<(), CacheStoreError> {
        self.entries_mut("flush").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn set_get_exists_delete() {
        let store = store();
        store.set("a", "1".into(), None).await.unwrap();

        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.delete(&["a".to_string()]).await.unwrap();
        assert!(!store.exists("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let store = store();
        store
            .set("short", "v".into(), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_prefix_only_touches_namespace() {
        let store = store();
        store.set("public:article:a", "1".into(), None).await.unwrap();
        store.set("public:articles:page:1", "2".into(), None).await.unwrap();
        store.set("dashboard:article:1", "3".into(), None).await.unwrap();

        let removed = store.delete_prefix("public:").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.exists("dashboard:article:1").await.unwrap());
    }

    #[tokio::test]
    async fn flush_empties_store() {
        let store = store();
        store.set("x", "1".into(), None).await.unwrap();
        store.set("y", "2".into(), None).await.unwrap();
        store.flush().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = MemoryStore::new(&CacheConfig {
            memory_capacity: 2,
            ..Default::default()
        });
        store.set("a", "1".into(), None).await.unwrap();
        store.set("b", "2".into(), None).await.unwrap();
        store.get("a").await.unwrap();
        store.set("c", "3".into(), None).await.unwrap();

        assert!(store.exists("a").await.unwrap());
        assert!(!store.exists("b").await.unwrap());
        assert!(store.exists("c").await.unwrap());
    }
}
