//! Anonymous, read-only views over published articles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

use crate::application::error::AppError;
use crate::application::pagination::{Page, PageLinks, PageRequest, PaginatedPage, StripInternal};
use crate::application::repos::{
    ArticleDetail, ArticleLink, ArticleSummary, ArticlesRepo, CategoriesRepo, PublishedFilter,
    UsersRepo,
};
use crate::cache::CacheLayer;
use crate::domain::entities::{AuthorRef, CategoryRecord, CategoryRef, LanguageRecord};

const RELATED_LIMIT: i64 = 3;
const NEWEST_LIMIT: i64 = 3;

/// Raw query parameters of the public listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicListQuery {
    pub page: Option<String>,
    pub category: Option<String>,
    pub username: Option<String>,
    pub search: Option<String>,
}

/// A published article stripped of ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicArticle {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub img_thumbnail: Option<String>,
    pub category: CategoryRef,
    pub author: AuthorRef,
    pub language: Option<LanguageRecord>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ArticleDetail> for PublicArticle {
    fn from(detail: ArticleDetail) -> Self {
        Self {
            title: detail.title,
            slug: detail.slug,
            body: detail.body,
            excerpt: detail.excerpt,
            img_thumbnail: detail.img_thumbnail,
            category: detail.category,
            author: detail.author,
            language: detail.language,
            created_at: detail.created_at,
            updated_at: detail.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicArticleView {
    pub article: PublicArticle,
    pub related_articles: Vec<ArticleSummary>,
    pub newest_articles: Vec<ArticleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePage {
    pub articles: PaginatedPage<ArticleSummary>,
    pub categories: Vec<CategoryRecord>,
}

#[derive(Clone)]
pub struct PublicArticleService {
    articles: Arc<dyn ArticlesRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
    cache: CacheLayer,
    listing_url: Url,
    per_page: u32,
}

impl PublicArticleService {
    /// `listing_url` is the absolute URL of the public listing endpoint;
    /// pagination links are built against it.
    pub fn new(
        articles: Arc<dyn ArticlesRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
        cache: CacheLayer,
        listing_url: Url,
        per_page: u32,
    ) -> Self {
        Self {
            articles,
            categories,
            users,
            cache,
            listing_url,
            per_page,
        }
    }

    /// Dispatches on the first filter present: category, then username,
    /// then search, then a bare page. Every branch needs `page`.
    pub async fn list(
        &self,
        query: &PublicListQuery,
    ) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let Some(page) = query.page.as_deref() else {
            return Err(AppError::not_found("Query was not found"));
        };
        let page = Some(page);

        if let Some(category) = non_blank(query.category.as_deref()) {
            return self.by_category(category, page).await;
        }
        if let Some(username) = non_blank(query.username.as_deref()) {
            return self.by_author(username, page).await;
        }
        if let Some(term) = non_blank(query.search.as_deref()) {
            return self.by_search(term, page).await;
        }
        self.by_page(page).await
    }

    pub async fn by_page(&self, page: Option<&str>) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let request = PageRequest::parse(page, self.per_page)?;
        let key = self.cache.keys.public_page(request.page());
        let links = self.links();

        self.cache
            .reads
            .get_or_load(&key, || self.load_page(PublishedFilter::All, request, links))
            .await
    }

    pub async fn by_category(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let request = PageRequest::parse(page, self.per_page)?;
        let key = self.cache.keys.public_category_page(slug, request.page());
        let links = self.links().with_filter("category", slug);

        self.cache
            .reads
            .get_or_load_keyed(key, || async {
                let category = self
                    .categories
                    .find_category_by_slug(slug)
                    .await?
                    .ok_or_else(|| AppError::not_found("Category not found"))?;
                self.load_page(PublishedFilter::Category(category.id), request, links)
                    .await
            })
            .await
    }

    pub async fn by_author(
        &self,
        username: &str,
        page: Option<&str>,
    ) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let request = PageRequest::parse(page, self.per_page)?;
        let key = self.cache.keys.public_author_page(username, request.page());
        let links = self.links().with_filter("username", username);

        self.cache
            .reads
            .get_or_load_keyed(key, || async {
                let user = self
                    .users
                    .find_user_by_username(username)
                    .await?
                    .ok_or_else(|| AppError::not_found("User not found"))?;
                self.load_page(PublishedFilter::Author(user.id), request, links)
                    .await
            })
            .await
    }

    /// Search results are never cached.
    pub async fn by_search(
        &self,
        term: &str,
        page: Option<&str>,
    ) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let request = PageRequest::parse(page, self.per_page)?;
        let links = self.links().with_filter("search", term);
        self.load_page(PublishedFilter::Search(term.to_string()), request, links)
            .await
    }

    pub async fn get(&self, slug: &str) -> Result<PublicArticleView, AppError> {
        let key = self.cache.keys.public_article(slug);

        self.cache
            .reads
            .get_or_load_keyed(key, || async {
                let detail = self
                    .articles
                    .find_published_detail(slug)
                    .await?
                    .ok_or_else(|| AppError::not_found("Article not found"))?;

                let related = self
                    .articles
                    .related_published(detail.category.id, &detail.slug, RELATED_LIMIT)
                    .await?;
                let newest = self.articles.newest_published(NEWEST_LIMIT).await?;

                Ok::<_, AppError>(PublicArticleView {
                    article: detail.into(),
                    related_articles: strip_all(related),
                    newest_articles: strip_all(newest),
                })
            })
            .await
    }

    pub async fn home(&self) -> Result<HomePage, AppError> {
        let key = self.cache.keys.public_home();
        let request = PageRequest::new(1, self.per_page)?;
        let links = self.links();

        self.cache
            .reads
            .get_or_load(&key, || async {
                let articles = self.load_page(PublishedFilter::All, request, links).await?;
                let categories = self.categories.list_categories().await?;
                Ok::<_, AppError>(HomePage {
                    articles,
                    categories,
                })
            })
            .await
    }

    pub async fn all(&self) -> Result<Vec<ArticleLink>, AppError> {
        let key = self.cache.keys.public_all();
        self.cache
            .reads
            .get_or_load(&key, || async {
                Ok::<_, AppError>(self.articles.all_published_links().await?)
            })
            .await
    }

    fn links(&self) -> PageLinks {
        PageLinks::new(self.listing_url.clone())
    }

    async fn load_page(
        &self,
        filter: PublishedFilter,
        request: PageRequest,
        links: PageLinks,
    ) -> Result<PaginatedPage<ArticleSummary>, AppError> {
        let page: Page<_> = self.articles.list_published(&filter, request).await?;
        Ok(PaginatedPage::format(page, request, &links))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn strip_all<R: StripInternal>(rows: Vec<R>) -> Vec<R::Public> {
    rows.into_iter().map(StripInternal::strip_internal).collect()
}
