//! Cache configuration.
//!
//! Built once at startup from `[cache]` settings and handed to every cache
//! component; nothing in the cache layer reads globals.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 3600;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;
const DEFAULT_DASHBOARD_PREFIX: &str = "dashboard";
const DEFAULT_PUBLIC_PREFIX: &str = "public";

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Redis,
}

/// How a write decides which cache entries to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Delete only the keys derived from the mutated entity; clear a
    /// namespace when the derived set is unbounded.
    Surgical,
    /// Delete everything on any mutation.
    Flush,
}

/// Top-level key prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheNamespace {
    pub dashboard: String,
    pub public: String,
}

impl Default for CacheNamespace {
    fn default() -> Self {
        Self {
            dashboard: DEFAULT_DASHBOARD_PREFIX.to_string(),
            public: DEFAULT_PUBLIC_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    /// Instance-level prefix prepended by the Redis backend.
    pub redis_key_prefix: String,
    pub policy: InvalidationPolicy,
    /// Safety-net expiry for every entry; `0` keeps entries until invalidated.
    pub ttl_seconds: u64,
    /// Maximum entries held by the in-memory backend.
    pub memory_capacity: usize,
    pub namespace: CacheNamespace,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            redis_key_prefix: String::new(),
            policy: InvalidationPolicy::Surgical,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            namespace: CacheNamespace::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            redis_key_prefix: settings.redis_key_prefix.clone(),
            policy: settings.policy,
            ttl_seconds: settings.ttl_seconds,
            memory_capacity: settings.memory_capacity,
            namespace: CacheNamespace {
                dashboard: settings.dashboard_prefix.clone(),
                public: settings.public_prefix.clone(),
            },
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
