//! User handlers: self-service under `/users/my`, administration elsewhere.

use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{AdminUser, AuthUser, ImageUpload, ValidatedJson};
use crate::infra::http::api::models::{
    PasswordChangeRequest, PasswordResetRequest, ProfileRequest, UserCreateRequest,
};
use crate::infra::http::api::state::AppState;

pub async fn get_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.users.profile(user.principal()).await?;
    Ok(Success::data(profile))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .users
        .update_profile(user.principal(), payload.into())
        .await?;
    Ok(Success::message("Profile successfully updated"))
}

pub async fn update_my_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<PasswordChangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .users
        .update_password(
            user.principal(),
            &payload.old_password,
            &payload.new_password,
            &payload.confirm_new_password,
        )
        .await?;
    Ok(Success::message("Password successfully updated"))
}

pub async fn update_my_image(
    State(state): State<AppState>,
    user: AuthUser,
    ImageUpload(data): ImageUpload,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.users.update_image(user.principal(), data).await?;
    Ok(Success::data(updated))
}

pub async fn list_users(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.users.list(admin.principal()).await?;
    Ok(Success::data(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ValidatedJson(payload): ValidatedJson<UserCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.create(admin.principal(), payload.into()).await?;
    Ok(Success::created_message("User successfully created"))
}

pub async fn get_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.get(admin.principal(), &username).await?;
    Ok(Success::data(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(username): Path<String>,
    ValidatedJson(payload): ValidatedJson<ProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .users
        .update(admin.principal(), &username, payload.into())
        .await?;
    Ok(Success::message("User successfully updated"))
}

pub async fn reset_user_password(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(username): Path<String>,
    ValidatedJson(payload): ValidatedJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .users
        .set_password(admin.principal(), &username, &payload.new_password)
        .await?;
    Ok(Success::message("Password successfully updated"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.users.delete(admin.principal(), &username).await?;
    Ok(Success::message("User successfully deleted"))
}
