//! Dashboard article handlers

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::infra::http::api::envelope::Success;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{AuthUser, ImageUpload, ValidatedJson};
use crate::infra::http::api::models::{ArticleRequest, DashboardListQuery, SlugPreviewRequest};
use crate::infra::http::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct SlugPreview {
    pub slug: String,
}

pub async fn list_articles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DashboardListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let articles = state
        .articles
        .list(user.principal(), query.is_draft.as_deref())
        .await?;
    Ok(Success::data(articles))
}

pub async fn create_article(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .articles
        .create(user.principal(), payload.into())
        .await?;
    Ok(Success::created(created))
}

pub async fn get_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.articles.get(user.principal(), &slug).await?;
    Ok(Success::data(article))
}

pub async fn update_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    ValidatedJson(payload): ValidatedJson<ArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .articles
        .update(user.principal(), &slug, payload.into())
        .await?;
    Ok(Success::message("Article successfully updated"))
}

pub async fn delete_article(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.articles.delete(user.principal(), &slug).await?;
    Ok(Success::message("Article successfully deleted"))
}

pub async fn generate_slug(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidatedJson(payload): ValidatedJson<SlugPreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let slug = state.articles.generate_slug(&payload.title).await?;
    Ok(Success::data(SlugPreview { slug }))
}

pub async fn upload_article_image(
    State(state): State<AppState>,
    _user: AuthUser,
    ImageUpload(data): ImageUpload,
) -> Result<impl IntoResponse, ApiError> {
    let uploaded = state.articles.upload_image(data).await?;
    Ok(Success::created(uploaded))
}

pub async fn article_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.articles.stats(user.principal()).await?;
    Ok(Success::data(stats))
}

pub async fn article_slugs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let slugs = state.articles.slugs(user.principal()).await?;
    Ok(Success::data(slugs))
}
