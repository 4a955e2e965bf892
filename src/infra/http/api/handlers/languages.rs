use axum::extract::State;
use axum::response::IntoResponse;

use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::AuthUser;
use crate::infra::http::api::state::AppState;

pub async fn list_languages(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let languages = state.languages.list().await?;
    Ok(Success::data(languages))
}
