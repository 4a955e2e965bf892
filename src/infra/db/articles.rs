use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::pagination::{Page, PageRequest},
    application::repos::{
        ArticleDetail, ArticleLink, ArticleStats, ArticleSummaryRow, ArticlesRepo,
        ArticlesWriteRepo, CreateArticleParams, DashboardArticleItem, PublishedFilter, RepoError,
        UpdateArticleParams,
    },
    domain::entities::{ArticleRecord, AuthorRef, CategoryRef, LanguageRecord},
    domain::types::Visibility,
};

use super::{PostgresRepositories, map_sqlx_error};

const ARTICLE_COLUMNS: &str = "id, title, slug, body, excerpt, img_thumbnail, is_draft, \
    category_id, user_id, lang_id, created_at, updated_at";

const DETAIL_SELECT: &str = "SELECT a.id, a.title, a.slug, a.body, a.excerpt, a.img_thumbnail, \
        a.is_draft, a.created_at, a.updated_at, \
        c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
        u.id AS author_id, u.name AS author_name, u.username AS author_username, \
        u.image AS author_image, \
        l.id AS language_id, l.code AS language_code, l.name AS language_name \
    FROM articles a \
    INNER JOIN categories c ON c.id = a.category_id \
    INNER JOIN users u ON u.id = a.user_id \
    LEFT JOIN languages l ON l.id = a.lang_id ";

const SUMMARY_SELECT: &str = "SELECT a.title, a.slug, a.excerpt, a.img_thumbnail, \
        a.created_at, a.updated_at, \
        c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
        u.id AS author_id, u.name AS author_name, u.username AS author_username, \
        u.image AS author_image \
    FROM articles a \
    INNER JOIN categories c ON c.id = a.category_id \
    INNER JOIN users u ON u.id = a.user_id ";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    slug: String,
    body: String,
    excerpt: String,
    img_thumbnail: Option<String>,
    is_draft: bool,
    category_id: i64,
    user_id: i64,
    lang_id: Option<i64>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            body: row.body,
            excerpt: row.excerpt,
            img_thumbnail: row.img_thumbnail,
            is_draft: row.is_draft,
            category_id: row.category_id,
            user_id: row.user_id,
            lang_id: row.lang_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: i64,
    title: String,
    slug: String,
    body: String,
    excerpt: String,
    img_thumbnail: Option<String>,
    is_draft: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    category_id: i64,
    category_name: String,
    category_slug: String,
    author_id: i64,
    author_name: String,
    author_username: String,
    author_image: Option<String>,
    language_id: Option<i64>,
    language_code: Option<String>,
    language_name: Option<String>,
}

impl From<DetailRow> for ArticleDetail {
    fn from(row: DetailRow) -> Self {
        let language = match (row.language_id, row.language_code, row.language_name) {
            (Some(id), Some(code), Some(name)) => Some(LanguageRecord { id, code, name }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            body: row.body,
            excerpt: row.excerpt,
            img_thumbnail: row.img_thumbnail,
            is_draft: row.is_draft,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
            author: AuthorRef {
                id: row.author_id,
                name: row.author_name,
                username: row.author_username,
                image: row.author_image,
            },
            language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    title: String,
    slug: String,
    excerpt: String,
    img_thumbnail: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    category_id: i64,
    category_name: String,
    category_slug: String,
    author_id: i64,
    author_name: String,
    author_username: String,
    author_image: Option<String>,
}

impl From<SummaryRow> for ArticleSummaryRow {
    fn from(row: SummaryRow) -> Self {
        Self {
            category_id: row.category_id,
            user_id: row.author_id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            img_thumbnail: row.img_thumbnail,
            category: CategoryRef {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
            author: AuthorRef {
                id: row.author_id,
                name: row.author_name,
                username: row.author_username,
                image: row.author_image,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DashboardRow {
    title: String,
    slug: String,
    is_draft: bool,
    category_id: i64,
    category_name: String,
    category_slug: String,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    title: String,
    slug: String,
    updated_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
pub(super) struct StatsRow {
    total: i64,
    draft_count: i64,
    publish_count: i64,
}

impl StatsRow {
    pub(super) fn into_stats(self) -> Result<ArticleStats, RepoError> {
        Ok(ArticleStats {
            total: PostgresRepositories::convert_count(self.total)?,
            draft_count: PostgresRepositories::convert_count(self.draft_count)?,
            publish_count: PostgresRepositories::convert_count(self.publish_count)?,
        })
    }
}

impl PostgresRepositories {
    fn apply_published_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PublishedFilter) {
        qb.push(" WHERE a.is_draft = FALSE");
        match filter {
            PublishedFilter::All => {}
            PublishedFilter::Category(id) => {
                qb.push(" AND a.category_id = ");
                qb.push_bind(*id);
            }
            PublishedFilter::Author(id) => {
                qb.push(" AND a.user_id = ");
                qb.push_bind(*id);
            }
            PublishedFilter::Search(term) => {
                let pattern = format!("%{}%", escape_like(term));
                qb.push(" AND (a.title ILIKE ");
                qb.push_bind(pattern.clone());
                qb.push(" OR a.body ILIKE ");
                qb.push_bind(pattern);
                qb.push(")");
            }
        }
    }
}

pub(super) const STATS_SELECT: &str = "SELECT COUNT(*) AS total, \
        COUNT(*) FILTER (WHERE is_draft) AS draft_count, \
        COUNT(*) FILTER (WHERE NOT is_draft) AS publish_count \
    FROM articles ";

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleRecord::from))
    }

    async fn load_article_detail(&self, id: i64) -> Result<Option<ArticleDetail>, RepoError> {
        let row = sqlx::query_as::<_, DetailRow>(&format!("{DETAIL_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleDetail::from))
    }

    async fn article_slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM articles WHERE slug = $1)")
            .bind(slug)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_owner_articles(
        &self,
        user_id: i64,
        visibility: Visibility,
    ) -> Result<Vec<DashboardArticleItem>, RepoError> {
        let rows = sqlx::query_as::<_, DashboardRow>(
            r#"
            SELECT a.title, a.slug, a.is_draft,
                   c.id AS category_id, c.name AS category_name, c.slug AS category_slug
            FROM articles a
            INNER JOIN categories c ON c.id = a.category_id
            WHERE a.user_id = $1 AND a.is_draft = $2
            ORDER BY a.id DESC
            "#,
        )
        .bind(user_id)
        .bind(visibility.is_draft())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| DashboardArticleItem {
                title: row.title,
                slug: row.slug,
                is_draft: row.is_draft,
                category: CategoryRef {
                    id: row.category_id,
                    name: row.category_name,
                    slug: row.category_slug,
                },
            })
            .collect())
    }

    async fn owner_article_stats(&self, user_id: i64) -> Result<ArticleStats, RepoError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!("{STATS_SELECT} WHERE user_id = $1"))
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.into_stats()
    }

    async fn owner_article_slugs(&self, user_id: i64) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            "SELECT slug FROM articles WHERE user_id = $1 ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_published(
        &self,
        filter: &PublishedFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleSummaryRow>, RepoError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        Self::apply_published_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(SUMMARY_SELECT);
        Self::apply_published_filter(&mut qb, filter);
        qb.push(" ORDER BY a.id DESC LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let rows = qb
            .build_query_as::<SummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(ArticleSummaryRow::from).collect(),
            Self::convert_count(total)?,
        ))
    }

    async fn find_published_detail(&self, slug: &str) -> Result<Option<ArticleDetail>, RepoError> {
        let row = sqlx::query_as::<_, DetailRow>(&format!(
            "{DETAIL_SELECT} WHERE a.slug = $1 AND a.is_draft = FALSE"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ArticleDetail::from))
    }

    async fn related_published(
        &self,
        category_id: i64,
        exclude_slug: &str,
        limit: i64,
    ) -> Result<Vec<ArticleSummaryRow>, RepoError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE a.is_draft = FALSE AND a.category_id = $1 AND a.slug <> $2 \
             ORDER BY a.id DESC LIMIT $3"
        ))
        .bind(category_id)
        .bind(exclude_slug)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleSummaryRow::from).collect())
    }

    async fn newest_published(&self, limit: i64) -> Result<Vec<ArticleSummaryRow>, RepoError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE a.is_draft = FALSE ORDER BY a.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleSummaryRow::from).collect())
    }

    async fn all_published_links(&self) -> Result<Vec<ArticleLink>, RepoError> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT title, slug, updated_at FROM articles WHERE is_draft = FALSE ORDER BY id DESC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ArticleLink {
                title: row.title,
                slug: row.slug,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl ArticlesWriteRepo for PostgresRepositories {
    async fn create_article(&self, params: CreateArticleParams) -> Result<ArticleRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "INSERT INTO articles \
                (title, slug, body, excerpt, img_thumbnail, is_draft, category_id, user_id, lang_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(&params.title)
        .bind(&params.slug)
        .bind(&params.body)
        .bind(&params.excerpt)
        .bind(params.img_thumbnail.as_deref())
        .bind(params.is_draft)
        .bind(params.category_id)
        .bind(params.user_id)
        .bind(params.lang_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_article(&self, params: UpdateArticleParams) -> Result<ArticleRecord, RepoError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "UPDATE articles SET \
                title = $2, body = $3, excerpt = $4, img_thumbnail = $5, is_draft = $6, \
                category_id = $7, lang_id = $8, updated_at = now() \
             WHERE id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(params.id)
        .bind(&params.title)
        .bind(&params.body)
        .bind(&params.excerpt)
        .bind(params.img_thumbnail.as_deref())
        .bind(params.is_draft)
        .bind(params.category_id)
        .bind(params.lang_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_article(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
