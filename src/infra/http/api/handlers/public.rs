//! Anonymous read endpoints under `/articles/public`.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::public_articles::PublicListQuery;
use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::AppState;

pub async fn list_public_articles(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.public_articles.list(&query).await?;
    Ok(Success::data(page))
}

pub async fn public_home(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let home = state.public_articles.home().await?;
    Ok(Success::data(home))
}

pub async fn public_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let links = state.public_articles.all().await?;
    Ok(Success::data(links))
}

pub async fn get_public_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.public_articles.get(&slug).await?;
    Ok(Success::data(view))
}
