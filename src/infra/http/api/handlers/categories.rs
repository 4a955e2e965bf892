//! Category handlers

use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{AdminUser, AuthUser, ValidatedJson};
use crate::infra::http::api::models::CategoryRequest;
use crate::infra::http::api::state::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.categories.list().await?;
    Ok(Success::data(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.categories.get(user.principal(), &slug).await?;
    Ok(Success::data(view))
}

pub async fn create_category(
    State(state): State<AppState>,
    admin: AdminUser,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .categories
        .create(admin.principal(), &payload.name)
        .await?;
    Ok(Success::created_message("Category successfully created"))
}

pub async fn update_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(slug): Path<String>,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .categories
        .update(admin.principal(), &slug, &payload.name)
        .await?;
    Ok(Success::message("Category successfully updated"))
}

pub async fn delete_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.categories.delete(admin.principal(), &slug).await?;
    Ok(Success::message("Category successfully deleted"))
}
