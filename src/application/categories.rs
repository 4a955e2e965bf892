use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::application::auth::Principal;
use crate::application::error::AppError;
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryArticleItem, CreateCategoryParams, RepoError,
    UpdateCategoryParams,
};
use crate::cache::{CacheEvent, CacheLayer};
use crate::domain::entities::CategoryRecord;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug};

pub const CATEGORY_IN_USE: &str = "The category is used by several articles";
const CATEGORY_NOT_FOUND: &str = "Category not found";

#[derive(Debug, Clone, Serialize)]
pub struct CategoryArticles {
    pub total: u64,
    pub draft_count: u64,
    pub publish_count: u64,
    pub article_list: Vec<CategoryArticleItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: CategoryRecord,
    pub articles: CategoryArticles,
}

#[derive(Clone)]
pub struct CategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    cache: CacheLayer,
}

impl CategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        cache: CacheLayer,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn list(&self) -> Result<Vec<CategoryRecord>, AppError> {
        Ok(self.reader.list_categories().await?)
    }

    /// The category with its article counts. Members only see their own
    /// articles.
    pub async fn get(&self, principal: &Principal, slug: &str) -> Result<CategoryView, AppError> {
        let category = self.find(slug).await?;
        let owner = (!principal.is_admin()).then_some(principal.user_id);

        let stats = self.reader.category_article_stats(category.id, owner).await?;
        let article_list = self.reader.list_category_articles(category.id, owner).await?;

        Ok(CategoryView {
            category,
            articles: CategoryArticles {
                total: stats.total,
                draft_count: stats.draft_count,
                publish_count: stats.publish_count,
                article_list,
            },
        })
    }

    pub async fn create(&self, principal: &Principal, name: &str) -> Result<CategoryRecord, AppError> {
        require_admin(principal)?;
        let name = name.trim();
        self.ensure_name_free(name, None).await?;
        let slug = self.unique_slug(name, None).await?;

        let record = self
            .writer
            .create_category(CreateCategoryParams {
                name: name.to_string(),
                slug,
            })
            .await?;

        self.cache
            .invalidator
            .invalidate(CacheEvent::CategoryChanged)
            .await;

        info!(category_id = record.id, slug = %record.slug, "category created");
        Ok(record)
    }

    /// Renames a category; its slug follows the new name.
    pub async fn update(
        &self,
        principal: &Principal,
        slug: &str,
        name: &str,
    ) -> Result<CategoryRecord, AppError> {
        require_admin(principal)?;
        let existing = self.find(slug).await?;
        let name = name.trim();
        self.ensure_name_free(name, Some(existing.id)).await?;
        let slug = self.unique_slug(name, Some(existing.id)).await?;

        let record = self
            .writer
            .update_category(UpdateCategoryParams {
                id: existing.id,
                name: name.to_string(),
                slug,
            })
            .await?;

        self.cache
            .invalidator
            .invalidate(CacheEvent::CategoryChanged)
            .await;

        info!(category_id = record.id, slug = %record.slug, "category updated");
        Ok(record)
    }

    pub async fn delete(&self, principal: &Principal, slug: &str) -> Result<(), AppError> {
        require_admin(principal)?;
        let existing = self.find(slug).await?;

        match self.writer.delete_category(existing.id).await {
            Ok(()) => {}
            Err(RepoError::Integrity { .. }) => return Err(AppError::bad_request(CATEGORY_IN_USE)),
            Err(err) => return Err(err.into()),
        }

        self.cache
            .invalidator
            .invalidate(CacheEvent::CategoryChanged)
            .await;

        info!(category_id = existing.id, slug = %existing.slug, "category deleted");
        Ok(())
    }

    async fn find(&self, slug: &str) -> Result<CategoryRecord, AppError> {
        self.reader
            .find_category_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found(CATEGORY_NOT_FOUND))
    }

    async fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<(), AppError> {
        if name.is_empty() {
            return Err(AppError::validation("name", "The name field is required"));
        }
        if self.reader.category_name_taken(name, except).await? {
            return Err(AppError::validation("name", "The name has already been taken"));
        }
        Ok(())
    }

    async fn unique_slug(&self, name: &str, except: Option<i64>) -> Result<String, AppError> {
        let reader = self.reader.clone();
        generate_unique_slug(name, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .category_slug_exists(&candidate, except)
                    .await
                    .map(|exists| !exists)
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(_) => {
                AppError::validation("name", "The name must contain letters or digits")
            }
            SlugAsyncError::Predicate(err) => err.into(),
        })
    }
}

pub(crate) fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("This action is reserved for administrators"))
    }
}
