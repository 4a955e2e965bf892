//! Process-wide tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    CACHE_FAIL_OPEN_TOTAL, CACHE_HIT_TOTAL, CACHE_INVALIDATION_FAILED_TOTAL,
    CACHE_INVALIDATION_TOTAL, CACHE_MISS_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::api::rate_limit::LOGIN_RATE_LIMITED_TOTAL;

use super::error::InfraError;

const COUNTERS: &[(&str, &str)] = &[
    (CACHE_HIT_TOTAL, "Reads served from the cache store."),
    (CACHE_MISS_TOTAL, "Reads that fell through to the repositories."),
    (
        CACHE_FAIL_OPEN_TOTAL,
        "Cache operations that failed and were bypassed.",
    ),
    (
        CACHE_INVALIDATION_TOTAL,
        "Invalidation plans executed after committed writes.",
    ),
    (
        CACHE_INVALIDATION_FAILED_TOTAL,
        "Invalidation plans that could not reach the store.",
    ),
    (
        LOGIN_RATE_LIMITED_TOTAL,
        "Login attempts rejected by the rate limiter.",
    ),
];

static DESCRIBED: Once = Once::new();

/// Installs the global subscriber. `RUST_LOG` directives override the
/// configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    DESCRIBED.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(*name, Unit::Count, *description);
        }
    });

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::Telemetry(err.to_string()))
}
