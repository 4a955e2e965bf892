pub mod api;
mod middleware;

pub use api::middleware::ClientKeys;
pub use api::rate_limit::ApiRateLimiter;
pub use api::{AppState, build_api_router};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Router, middleware as axum_middleware};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

use api::envelope::Success;
use api::error::{ApiError, ErrorCategory};
use middleware::trace_requests;

/// Headroom for multipart framing on top of the largest accepted image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .uploads
        .max_image_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health))
        .merge(build_api_router(state.clone()))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(trace_requests))
}

async fn health(State(state): State<AppState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => Success::message("Service is healthy").into_response(),
        Err(err) => {
            let mut response = ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::Database,
                "Database is unavailable",
            )
            .into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
