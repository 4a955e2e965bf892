//! inkpost cache system
//!
//! A read-through cache in front of the repositories, backed by either an
//! in-process LRU or Redis:
//!
//! - [`KeyBuilder`] names every entry (`dashboard:…`, `public:…`)
//! - [`ReadThroughCache`] serves hits and fills misses
//! - [`CacheInvalidator`] drops stale entries after each committed write
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! policy = "surgical"
//! ttl_seconds = 3600
//! ```

mod config;
mod keys;
mod layer;
mod planner;
mod read_through;
mod redis_store;
mod store;
mod trigger;

pub use config::{CacheBackend, CacheConfig, CacheNamespace, InvalidationPolicy};
pub use keys::{CacheKey, KeyBuilder, KeyError};
pub use layer::CacheLayer;
pub use planner::{CacheEvent, InvalidationPlan};
pub use read_through::ReadThroughCache;
pub use redis_store::RedisStore;
pub use store::{CacheStore, CacheStoreError, MemoryStore};
pub use trigger::CacheInvalidator;

pub(crate) use read_through::{CACHE_FAIL_OPEN_TOTAL, CACHE_HIT_TOTAL, CACHE_MISS_TOTAL};
pub(crate) use trigger::{CACHE_INVALIDATION_FAILED_TOTAL, CACHE_INVALIDATION_TOTAL};
