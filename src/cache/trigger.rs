//! Post-commit cache invalidation.
//!
//! Write paths call [`CacheInvalidator::invalidate`] once their transaction
//! has committed. Store failures are logged and counted; the entries they
//! leave behind expire with the configured TTL.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error};

use super::config::InvalidationPolicy;
use super::keys::KeyBuilder;
use super::planner::{CacheEvent, InvalidationPlan};
use super::store::{CacheStore, CacheStoreError};

pub const CACHE_INVALIDATION_TOTAL: &str = "inkpost_cache_invalidation_total";
pub const CACHE_INVALIDATION_FAILED_TOTAL: &str = "inkpost_cache_invalidation_failed_total";

#[derive(Clone)]
pub struct CacheInvalidator {
    store: Arc<dyn CacheStore>,
    keys: Arc<KeyBuilder>,
    policy: InvalidationPolicy,
}

impl CacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>, keys: Arc<KeyBuilder>, policy: InvalidationPolicy) -> Self {
        Self {
            store,
            keys,
            policy,
        }
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    pub fn plan(&self, event: &CacheEvent) -> InvalidationPlan {
        InvalidationPlan::for_event(event, self.policy, &self.keys)
    }

    /// Applies the plan for `event`. Never fails the caller.
    pub async fn invalidate(&self, event: CacheEvent) {
        let plan = self.plan(&event);
        if plan.is_empty() {
            return;
        }

        match self.execute(&plan).await {
            Ok(()) => {
                counter!(CACHE_INVALIDATION_TOTAL, "event" => event.kind()).increment(1);
                debug!(event = event.kind(), %plan, "cache invalidated");
            }
            Err(err) => {
                counter!(CACHE_INVALIDATION_FAILED_TOTAL, "event" => event.kind()).increment(1);
                error!(
                    event = event.kind(),
                    %plan,
                    error = %err,
                    "cache invalidation failed; stale entries remain until expiry"
                );
            }
        }
    }

    /// Applies the plan and reports store failures to the caller.
    pub async fn execute(&self, plan: &InvalidationPlan) -> Result<(), CacheStoreError> {
        if plan.flush_all {
            return self.store.flush().await;
        }

        if !plan.keys.is_empty() {
            let keys: Vec<String> = plan.keys.iter().map(ToString::to_string).collect();
            self.store.delete(&keys).await?;
        }

        for prefix in &plan.prefixes {
            let removed = self.store.delete_prefix(prefix).await?;
            debug!(prefix = %prefix, removed, "cleared cache namespace");
        }

        Ok(())
    }
}
