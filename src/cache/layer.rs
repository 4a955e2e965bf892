use std::sync::Arc;

use super::config::CacheConfig;
use super::keys::{KeyBuilder, KeyError};
use super::read_through::ReadThroughCache;
use super::store::CacheStore;
use super::trigger::CacheInvalidator;

/// The cache handles a service needs, sharing one store and one key builder.
#[derive(Clone)]
pub struct CacheLayer {
    pub reads: ReadThroughCache,
    pub keys: Arc<KeyBuilder>,
    pub invalidator: CacheInvalidator,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Result<Self, KeyError> {
        let keys = Arc::new(KeyBuilder::new(&config.namespace)?);
        Ok(Self {
            reads: ReadThroughCache::new(store.clone(), config.ttl()),
            invalidator: CacheInvalidator::new(store, keys.clone(), config.policy),
            keys,
        })
    }
}
