use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{
        ArticleStats, CategoriesRepo, CategoriesWriteRepo, CategoryArticleItem,
        CreateCategoryParams, RepoError, UpdateCategoryParams,
    },
    domain::entities::{AuthorRef, CategoryRecord},
};

use super::articles::{STATS_SELECT, StatsRow};
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CategoryArticleRow {
    title: String,
    slug: String,
    is_draft: bool,
    updated_at: OffsetDateTime,
    author_id: i64,
    author_name: String,
    author_username: String,
    author_image: Option<String>,
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, created_at, updated_at FROM categories ORDER BY LOWER(name), id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, created_at, updated_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }

    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories \
             WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(except)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn category_slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories \
             WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(except)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn category_article_stats(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<ArticleStats, RepoError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "{STATS_SELECT} WHERE category_id = $1 AND ($2::BIGINT IS NULL OR user_id = $2)"
        ))
        .bind(category_id)
        .bind(owner)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.into_stats()
    }

    async fn list_category_articles(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<Vec<CategoryArticleItem>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryArticleRow>(
            r#"
            SELECT a.title, a.slug, a.is_draft, a.updated_at,
                   u.id AS author_id, u.name AS author_name,
                   u.username AS author_username, u.image AS author_image
            FROM articles a
            INNER JOIN users u ON u.id = a.user_id
            WHERE a.category_id = $1 AND ($2::BIGINT IS NULL OR a.user_id = $2)
            ORDER BY a.id DESC
            "#,
        )
        .bind(category_id)
        .bind(owner)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryArticleItem {
                title: row.title,
                slug: row.slug,
                is_draft: row.is_draft,
                author: AuthorRef {
                    id: row.author_id,
                    name: row.author_name,
                    username: row.author_username,
                    image: row.author_image,
                },
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl CategoriesWriteRepo for PostgresRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) \
             RETURNING id, name, slug, created_at, updated_at",
        )
        .bind(&params.name)
        .bind(&params.slug)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, slug = $3, updated_at = now() WHERE id = $1 \
             RETURNING id, name, slug, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(&params.slug)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_category(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        // Row lock blocks concurrent article inserts referencing this category.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if locked.is_none() {
            return Err(RepoError::NotFound);
        }

        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM articles WHERE category_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if in_use {
            return Err(RepoError::Integrity {
                message: format!("category {id} is referenced by articles"),
            });
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
