//! Read-through caching over a [`CacheStore`].
//!
//! Values are stored as JSON snapshots. The cache is an accelerator, never a
//! source of truth: when the store misbehaves the loader result is returned
//! directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::keys::{CacheKey, KeyError};
use super::store::CacheStore;

pub const CACHE_HIT_TOTAL: &str = "inkpost_cache_hit_total";
pub const CACHE_MISS_TOTAL: &str = "inkpost_cache_miss_total";
pub const CACHE_FAIL_OPEN_TOTAL: &str = "inkpost_cache_fail_open_total";

#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Option<Duration>) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the cached value under `key`, or runs `loader` and caches its
    /// result.
    ///
    /// A loader error is returned as-is and nothing is written. Empty values
    /// are cached like any other. Concurrent misses may both load; the last
    /// write wins.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(CACHE_HIT_TOTAL).increment(1);
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(
                        key = %key,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                    if let Err(err) = self.store.delete(&[key.to_string()]).await {
                        warn!(key = %key, error = %err, "failed to delete undecodable entry");
                    }
                }
            },
            Ok(None) => {}
            Err(err) => {
                counter!(CACHE_FAIL_OPEN_TOTAL).increment(1);
                warn!(
                    key = %key,
                    error = %err,
                    "cache read failed; serving from backing store"
                );
                return loader().await;
            }
        }

        counter!(CACHE_MISS_TOTAL).increment(1);
        debug!(key = %key, "cache miss");

        let value = loader().await?;
        self.write(key, &value).await;
        Ok(value)
    }

    /// Like [`get_or_load`](Self::get_or_load) but bypasses the cache when
    /// the key could not be built.
    pub async fn get_or_load_keyed<T, E, F, Fut>(
        &self,
        key: Result<CacheKey, KeyError>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match key {
            Ok(key) => self.get_or_load(&key, loader).await,
            Err(err) => {
                debug!(error = %err, "uncacheable key; loading directly");
                loader().await
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                warn!(key = %key, error = %err, "failed to serialize cache value");
                return;
            }
        };

        if let Err(err) = self.store.set(key.as_str(), json, self.ttl).await {
            counter!(CACHE_FAIL_OPEN_TOTAL).increment(1);
            warn!(
                key = %key,
                error = %err,
                "cache write failed; value served uncached"
            );
        }
    }
}
