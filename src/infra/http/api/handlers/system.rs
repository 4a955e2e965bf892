//! Operational endpoints: stored images and the manual cache flush.

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::application::error::AppError;
use crate::cache::InvalidationPlan;
use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::AdminUser;
use crate::infra::http::api::state::AppState;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

pub async fn flush_cache(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    state
        .cache
        .invalidator
        .execute(&InvalidationPlan::flush())
        .await
        .map_err(|err| ApiError::server("infra::http::api::cache_flush", &err))?;

    info!(admin_id = admin.principal().user_id, "cache flushed on request");
    Ok(Success::message("Cache successfully flushed"))
}

pub async fn serve_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let stored_path = format!("images/{path}");
    let data = state
        .uploads
        .read(&stored_path)
        .await
        .map_err(AppError::from)?;

    let mime = mime_guess::from_path(&stored_path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL)),
        ],
        data,
    )
        .into_response())
}
