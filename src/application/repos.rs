//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{Page, PageRequest, StripInternal};
use crate::domain::entities::{
    ArticleRecord, AuthorRef, CategoryRecord, CategoryRef, LanguageRecord, UserRecord,
};
use crate::domain::types::Visibility;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Row of an author's dashboard list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardArticleItem {
    pub title: String,
    pub slug: String,
    pub is_draft: bool,
    pub category: CategoryRef,
}

/// An article joined with its category, author and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub is_draft: bool,
    pub category: CategoryRef,
    pub author: AuthorRef,
    pub language: Option<LanguageRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Published article row as read from storage, foreign keys included.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSummaryRow {
    pub category_id: i64,
    pub user_id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub category: CategoryRef,
    pub author: AuthorRef,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Published article as exposed to anonymous readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub category: CategoryRef,
    pub author: AuthorRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StripInternal for ArticleSummaryRow {
    type Public = ArticleSummary;

    fn strip_internal(self) -> ArticleSummary {
        ArticleSummary {
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            img_thumbnail: self.img_thumbnail,
            category: self.category,
            author: self.author,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleLink {
    pub title: String,
    pub slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStats {
    pub total: u64,
    pub draft_count: u64,
    pub publish_count: u64,
}

/// Article row shown on a category page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryArticleItem {
    pub title: String,
    pub slug: String,
    pub is_draft: bool,
    pub author: AuthorRef,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub username: String,
    pub email: String,
    pub image: Option<String>,
    pub is_admin: bool,
    pub articles_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryArticleCount {
    pub category: CategoryRef,
    pub articles_count: u64,
}

/// Which published articles a public listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedFilter {
    All,
    Category(i64),
    Author(i64),
    Search(String),
}

// ---------------------------------------------------------------------------
// Write parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub is_draft: bool,
    pub category_id: i64,
    pub user_id: i64,
    pub lang_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateArticleParams {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub is_draft: bool,
    pub category_id: i64,
    pub lang_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError>;

    async fn load_article_detail(&self, id: i64) -> Result<Option<ArticleDetail>, RepoError>;

    async fn article_slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Newest first.
    async fn list_owner_articles(
        &self,
        user_id: i64,
        visibility: Visibility,
    ) -> Result<Vec<DashboardArticleItem>, RepoError>;

    async fn owner_article_stats(&self, user_id: i64) -> Result<ArticleStats, RepoError>;

    async fn owner_article_slugs(&self, user_id: i64) -> Result<Vec<String>, RepoError>;

    /// Published articles matching `filter`, newest first.
    async fn list_published(
        &self,
        filter: &PublishedFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleSummaryRow>, RepoError>;

    async fn find_published_detail(&self, slug: &str) -> Result<Option<ArticleDetail>, RepoError>;

    async fn related_published(
        &self,
        category_id: i64,
        exclude_slug: &str,
        limit: i64,
    ) -> Result<Vec<ArticleSummaryRow>, RepoError>;

    async fn newest_published(&self, limit: i64) -> Result<Vec<ArticleSummaryRow>, RepoError>;

    async fn all_published_links(&self) -> Result<Vec<ArticleLink>, RepoError>;
}

/// Each call runs in its own transaction; a returned `Ok` means committed.
#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, params: CreateArticleParams) -> Result<ArticleRecord, RepoError>;

    async fn update_article(&self, params: UpdateArticleParams) -> Result<ArticleRecord, RepoError>;

    async fn delete_article(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError>;

    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> Result<bool, RepoError>;

    async fn category_slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError>;

    /// Counts of the category's articles, restricted to `owner` when given.
    async fn category_article_stats(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<ArticleStats, RepoError>;

    async fn list_category_articles(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<Vec<CategoryArticleItem>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(&self, params: CreateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn update_category(&self, params: UpdateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    /// Fails with [`RepoError::Integrity`] while any article references the category.
    async fn delete_category(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, RepoError>;

    async fn username_taken(&self, username: &str, except: Option<i64>) -> Result<bool, RepoError>;

    /// Every user except `exclude`, most recently updated first.
    async fn list_users(&self, exclude: i64) -> Result<Vec<UserSummary>, RepoError>;

    async fn user_article_count(&self, user_id: i64) -> Result<u64, RepoError>;

    async fn user_category_counts(&self, user_id: i64)
    -> Result<Vec<CategoryArticleCount>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError>;

    /// Stores the new image path and returns the one it replaced.
    async fn update_image(&self, id: i64, image: Option<&str>) -> Result<Option<String>, RepoError>;

    /// Fails with [`RepoError::Integrity`] while the user still owns articles.
    async fn delete_user(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait LanguagesRepo: Send + Sync {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError>;

    async fn find_language(&self, id: i64) -> Result<Option<LanguageRecord>, RepoError>;
}

/// Connectivity probe for the backing store.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
