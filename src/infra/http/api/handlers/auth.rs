//! Authentication handlers

use axum::extract::State;
use axum::response::IntoResponse;

use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{AuthUser, ValidatedJson};
use crate::infra::http::api::models::LoginRequest;
use crate::infra::http::api::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Success::created(token))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(&session);
    Ok(Success::message("Access token has been removed"))
}

pub async fn check_token(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Success::data(state.auth.check(&session)))
}
