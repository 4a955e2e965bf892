//! Dashboard article management for authors and admins.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::auth::Principal;
use crate::application::error::AppError;
use crate::application::repos::{
    ArticleDetail, ArticleStats, ArticlesRepo, ArticlesWriteRepo, CategoriesRepo,
    CreateArticleParams, DashboardArticleItem, LanguagesRepo, UpdateArticleParams,
};
use crate::cache::{CacheEvent, CacheLayer};
use crate::domain::articles::derive_excerpt;
use crate::domain::entities::ArticleRecord;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug};
use crate::domain::types::{Visibility, parse_flag};
use crate::infra::uploads::{ARTICLE_IMAGE_DIR, UploadStorage};

pub const ARTICLE_NOT_FOUND: &str = "Article not found";

#[derive(Debug, Clone)]
pub struct ArticleCommand {
    pub title: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub img_thumbnail: Option<String>,
    pub is_draft: bool,
    /// Category slug.
    pub category: String,
    pub lang_id: Option<i64>,
}

/// An author's dashboard list for one visibility partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardArticles {
    pub articles_count: usize,
    pub articles: Vec<DashboardArticleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedArticle {
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    pub path: String,
    pub image_url: String,
}

#[derive(Clone)]
pub struct ArticleService {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    languages: Arc<dyn LanguagesRepo>,
    uploads: Arc<UploadStorage>,
    cache: CacheLayer,
}

impl ArticleService {
    pub fn new(
        reader: Arc<dyn ArticlesRepo>,
        writer: Arc<dyn ArticlesWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        languages: Arc<dyn LanguagesRepo>,
        uploads: Arc<UploadStorage>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            languages,
            uploads,
            cache,
        }
    }

    /// The caller's drafts or published articles, selected by the raw
    /// `is_draft` query value.
    pub async fn list(
        &self,
        principal: &Principal,
        is_draft: Option<&str>,
    ) -> Result<DashboardArticles, AppError> {
        let raw = is_draft
            .ok_or_else(|| AppError::not_found("The is_draft query value was not found"))?;
        let visibility = Visibility::from_is_draft(parse_flag(raw)?);
        let user_id = principal.user_id;

        let key = self.cache.keys.dashboard_list(user_id, visibility);
        self.cache
            .reads
            .get_or_load(&key, || async {
                let articles = self.reader.list_owner_articles(user_id, visibility).await?;
                Ok::<_, AppError>(DashboardArticles {
                    articles_count: articles.len(),
                    articles,
                })
            })
            .await
    }

    pub async fn get(&self, principal: &Principal, slug: &str) -> Result<ArticleDetail, AppError> {
        let article = self.owned_article(principal, slug).await?;
        let key = self.cache.keys.dashboard_article(article.id);

        self.cache
            .reads
            .get_or_load(&key, || async {
                self.reader
                    .load_article_detail(article.id)
                    .await?
                    .ok_or_else(|| AppError::not_found(ARTICLE_NOT_FOUND))
            })
            .await
    }

    pub async fn create(
        &self,
        principal: &Principal,
        command: ArticleCommand,
    ) -> Result<CreatedArticle, AppError> {
        let category_id = self.resolve_category(&command.category).await?;
        self.ensure_language(command.lang_id).await?;
        self.ensure_thumbnail(command.img_thumbnail.as_deref())?;

        let slug = self.unique_slug(&command.title).await?;
        let excerpt = excerpt_for(command.excerpt.as_deref(), &command.body);

        let record = self
            .writer
            .create_article(CreateArticleParams {
                title: command.title,
                slug,
                body: command.body,
                excerpt,
                img_thumbnail: command.img_thumbnail,
                is_draft: command.is_draft,
                category_id,
                user_id: principal.user_id,
                lang_id: command.lang_id,
            })
            .await?;

        self.cache
            .invalidator
            .invalidate(CacheEvent::ArticleCreated {
                article_id: record.id,
                owner_id: record.user_id,
                is_draft: record.is_draft,
            })
            .await;

        info!(article_id = record.id, slug = %record.slug, user_id = principal.user_id, "article created");
        Ok(CreatedArticle { slug: record.slug })
    }

    /// Edits an article in place. The slug never changes.
    pub async fn update(
        &self,
        principal: &Principal,
        slug: &str,
        command: ArticleCommand,
    ) -> Result<(), AppError> {
        let existing = self.owned_article(principal, slug).await?;
        let category_id = self.resolve_category(&command.category).await?;
        self.ensure_language(command.lang_id).await?;
        self.ensure_thumbnail(command.img_thumbnail.as_deref())?;

        let excerpt = excerpt_for(command.excerpt.as_deref(), &command.body);
        let replaced_thumbnail = existing
            .img_thumbnail
            .clone()
            .filter(|old| command.img_thumbnail.as_deref() != Some(old.as_str()));

        let updated = self
            .writer
            .update_article(UpdateArticleParams {
                id: existing.id,
                title: command.title,
                body: command.body,
                excerpt,
                img_thumbnail: command.img_thumbnail,
                is_draft: command.is_draft,
                category_id,
                lang_id: command.lang_id,
            })
            .await?;

        self.cache
            .invalidator
            .invalidate(CacheEvent::ArticleUpdated {
                article_id: updated.id,
                owner_id: updated.user_id,
                slug: updated.slug.clone(),
                was_draft: existing.is_draft,
                is_draft: updated.is_draft,
            })
            .await;

        if let Some(old) = replaced_thumbnail {
            self.remove_file(&old).await;
        }

        info!(article_id = updated.id, slug = %updated.slug, "article updated");
        Ok(())
    }

    pub async fn delete(&self, principal: &Principal, slug: &str) -> Result<(), AppError> {
        let existing = self.owned_article(principal, slug).await?;

        self.writer.delete_article(existing.id).await?;

        self.cache
            .invalidator
            .invalidate(CacheEvent::ArticleDeleted {
                article_id: existing.id,
                owner_id: existing.user_id,
                slug: existing.slug.clone(),
                was_draft: existing.is_draft,
            })
            .await;

        if let Some(path) = existing.img_thumbnail.as_deref() {
            self.remove_file(path).await;
        }

        info!(article_id = existing.id, slug = %existing.slug, "article deleted");
        Ok(())
    }

    /// The slug a new article with `title` would receive right now.
    pub async fn generate_slug(&self, title: &str) -> Result<String, AppError> {
        self.unique_slug(title).await
    }

    pub async fn stats(&self, principal: &Principal) -> Result<ArticleStats, AppError> {
        Ok(self.reader.owner_article_stats(principal.user_id).await?)
    }

    pub async fn slugs(&self, principal: &Principal) -> Result<Vec<String>, AppError> {
        Ok(self.reader.owner_article_slugs(principal.user_id).await?)
    }

    pub async fn upload_image(&self, data: Bytes) -> Result<UploadedImage, AppError> {
        let stored = self.uploads.store_image(ARTICLE_IMAGE_DIR, data).await?;
        Ok(UploadedImage {
            image_url: self.uploads.public_url(&stored.stored_path),
            path: stored.stored_path,
        })
    }

    async fn owned_article(
        &self,
        principal: &Principal,
        slug: &str,
    ) -> Result<ArticleRecord, AppError> {
        let article = self
            .reader
            .find_article_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found(ARTICLE_NOT_FOUND))?;

        if !principal.can_manage(article.user_id) {
            return Err(AppError::forbidden("You are not allowed to access this article"));
        }

        Ok(article)
    }

    async fn resolve_category(&self, slug: &str) -> Result<i64, AppError> {
        self.categories
            .find_category_by_slug(slug)
            .await?
            .map(|category| category.id)
            .ok_or_else(|| AppError::validation("category", "The selected category is invalid"))
    }

    async fn ensure_language(&self, lang_id: Option<i64>) -> Result<(), AppError> {
        let Some(id) = lang_id else {
            return Ok(());
        };
        match self.languages.find_language(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation("lang_id", "The selected language is invalid")),
        }
    }

    fn ensure_thumbnail(&self, path: Option<&str>) -> Result<(), AppError> {
        match path {
            Some(path) if !is_article_image(path) => Err(AppError::validation(
                "img_thumbnail",
                "The thumbnail must be an uploaded article image",
            )),
            _ => Ok(()),
        }
    }

    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let reader = self.reader.clone();
        generate_unique_slug(title, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .article_slug_exists(&candidate)
                    .await
                    .map(|exists| !exists)
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => AppError::from(err),
            SlugAsyncError::Predicate(err) => AppError::from(err),
        })
    }

    async fn remove_file(&self, path: &str) {
        if let Err(err) = self.uploads.delete(path).await {
            warn!(path, error = %err, "failed to remove replaced article image");
        }
    }
}

fn excerpt_for(explicit: Option<&str>, body: &str) -> String {
    match explicit.map(str::trim) {
        Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
        _ => derive_excerpt(body),
    }
}

fn is_article_image(path: &str) -> bool {
    path.strip_prefix(ARTICLE_IMAGE_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_excerpt_wins_unless_blank() {
        assert_eq!(excerpt_for(Some(" Custom "), "body text"), "Custom");
        assert_eq!(excerpt_for(Some("  "), "body text"), "body text");
        assert_eq!(excerpt_for(None, "body text"), "body text");
    }

    #[test]
    fn thumbnails_must_live_in_article_dir() {
        assert!(is_article_image("images/articles/abc.png"));
        assert!(!is_article_image("images/users/abc.png"));
        assert!(!is_article_image("images/articles/../users/abc.png"));
        assert!(!is_article_image("images/articles/"));
    }
}
