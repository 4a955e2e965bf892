use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const LOGIN_RATE_LIMITED_TOTAL: &str = "inkpost_login_rate_limited_total";

/// Sliding-window limiter keyed by caller and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn check(&self, key: &str, route: &str) -> RateDecision {
        self.check_at(key, route, Instant::now())
    }

    fn check_at(&self, key: &str, route: &str, now: Instant) -> RateDecision {
        let bucket_key = format!("{key}:{route}");
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.saturating_sub(used);
        if remaining == 0 {
            // The oldest hit leaves the window first.
            let retry_after = entry
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            // Whole seconds, rounded up.
            let retry_after_secs =
                retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return RateDecision::Limited {
                retry_after_secs: retry_after_secs.max(1),
            };
        }

        entry.push(now);
        RateDecision::Allowed {
            remaining: remaining.saturating_sub(1),
        }
    }
}
