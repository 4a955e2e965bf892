//! In-memory repositories and service wiring shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use url::Url;

use inkpost::application::articles::{ArticleCommand, ArticleService};
use inkpost::application::auth::{AuthService, Principal};
use inkpost::application::categories::CategoryService;
use inkpost::application::languages::LanguageService;
use inkpost::application::pagination::{Page, PageRequest};
use inkpost::application::public_articles::PublicArticleService;
use inkpost::application::repos::{
    ArticleDetail, ArticleLink, ArticleStats, ArticleSummaryRow, ArticlesRepo, ArticlesWriteRepo,
    CategoriesRepo, CategoriesWriteRepo, CategoryArticleCount, CategoryArticleItem,
    CreateArticleParams, CreateCategoryParams, CreateUserParams, DashboardArticleItem, HealthRepo,
    LanguagesRepo, PublishedFilter, RepoError, UpdateArticleParams, UpdateCategoryParams,
    UpdateProfileParams, UserSummary, UsersRepo, UsersWriteRepo,
};
use inkpost::application::users::UserService;
use inkpost::cache::{
    CacheConfig, CacheLayer, CacheStore, CacheStoreError, InvalidationPolicy, MemoryStore,
};
use inkpost::domain::entities::{
    ArticleRecord, AuthorRef, CategoryRecord, CategoryRef, LanguageRecord, UserRecord,
};
use inkpost::domain::types::{Role, Visibility};
use inkpost::infra::http::{ApiRateLimiter, AppState, ClientKeys};
use inkpost::infra::security::{JwtKeys, PasswordHashing};
use inkpost::infra::uploads::UploadStorage;

pub const PUBLIC_URL: &str = "http://localhost:3000";
pub const PASSWORD: &str = "correct-horse";
pub const JWT_SECRET: &str = "integration-test-secret-with-32-bytes!!";
pub const PER_PAGE: u32 = 2;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<UserRecord>,
    categories: Vec<CategoryRecord>,
    articles: Vec<ArticleRecord>,
    languages: Vec<LanguageRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Distinct, increasing timestamps so "newest first" is deterministic.
    fn stamp(&self) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::days(20_000) + Duration::seconds(self.next_id)
    }

    fn category_ref(&self, id: i64) -> CategoryRef {
        let category = self
            .categories
            .iter()
            .find(|category| category.id == id)
            .expect("category exists");
        CategoryRef {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
        }
    }

    fn author_ref(&self, id: i64) -> AuthorRef {
        let user = self.users.iter().find(|user| user.id == id).expect("user exists");
        AuthorRef {
            id: user.id,
            name: user.name.clone(),
            username: user.username.clone(),
            image: user.image.clone(),
        }
    }

    fn detail(&self, article: &ArticleRecord) -> ArticleDetail {
        ArticleDetail {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            body: article.body.clone(),
            excerpt: article.excerpt.clone(),
            img_thumbnail: article.img_thumbnail.clone(),
            is_draft: article.is_draft,
            category: self.category_ref(article.category_id),
            author: self.author_ref(article.user_id),
            language: article
                .lang_id
                .and_then(|id| self.languages.iter().find(|lang| lang.id == id).cloned()),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }

    fn summary(&self, article: &ArticleRecord) -> ArticleSummaryRow {
        ArticleSummaryRow {
            category_id: article.category_id,
            user_id: article.user_id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            excerpt: article.excerpt.clone(),
            img_thumbnail: article.img_thumbnail.clone(),
            category: self.category_ref(article.category_id),
            author: self.author_ref(article.user_id),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }

    fn published_newest_first(&self) -> Vec<&ArticleRecord> {
        let mut published: Vec<&ArticleRecord> =
            self.articles.iter().filter(|article| !article.is_draft).collect();
        published.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        published
    }

    fn stats<'a>(articles: impl Iterator<Item = &'a ArticleRecord>) -> ArticleStats {
        let mut stats = ArticleStats::default();
        for article in articles {
            stats.total += 1;
            if article.is_draft {
                stats.draft_count += 1;
            } else {
                stats.publish_count += 1;
            }
        }
        stats
    }
}

/// Every repository trait over one set of in-memory tables.
#[derive(Default)]
pub struct MemoryRepos {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
}

impl MemoryRepos {
    /// Number of read queries served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes every subsequent read fail until switched off again.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn seed_language(&self, code: &str, name: &str) -> LanguageRecord {
        let mut tables = self.write();
        let language = LanguageRecord {
            id: tables.next_id(),
            code: code.to_string(),
            name: name.to_string(),
        };
        tables.languages.push(language.clone());
        language
    }

    pub fn seed_user(&self, username: &str, password_hash: &str, is_admin: bool) -> UserRecord {
        let mut tables = self.write();
        let id = tables.next_id();
        let now = tables.stamp();
        let user = UserRecord {
            id,
            name: format!("{username} name"),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: password_hash.to_string(),
            is_admin,
            image: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        user
    }

    pub fn seed_category(&self, name: &str, slug: &str) -> CategoryRecord {
        let mut tables = self.write();
        let id = tables.next_id();
        let now = tables.stamp();
        let category = CategoryRecord {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        category
    }

    pub fn seed_article(
        &self,
        owner: &UserRecord,
        category: &CategoryRecord,
        slug: &str,
        is_draft: bool,
    ) -> ArticleRecord {
        let mut tables = self.write();
        let id = tables.next_id();
        let now = tables.stamp();
        let article = ArticleRecord {
            id,
            title: format!("Title of {slug}"),
            slug: slug.to_string(),
            body: format!("Body of {slug}"),
            excerpt: format!("Body of {slug}"),
            img_thumbnail: None,
            is_draft,
            category_id: category.id,
            user_id: owner.id,
            lang_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(article.clone());
        article
    }

    /// Changes a title behind the services' back, so no invalidation runs.
    pub fn retitle_silently(&self, slug: &str, title: &str) {
        let mut tables = self.write();
        if let Some(article) = tables.articles.iter_mut().find(|article| article.slug == slug) {
            article.title = title.to_string();
        }
    }

    pub fn rewrite_body_silently(&self, slug: &str, body: &str) {
        let mut tables = self.write();
        if let Some(article) = tables.articles.iter_mut().find(|article| article.slug == slug) {
            article.body = body.to_string();
        }
    }

    pub fn category_exists(&self, slug: &str) -> bool {
        self.write().categories.iter().any(|category| category.slug == slug)
    }

    fn read(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection reset by peer".into()));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.write())
    }

    fn write(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock")
    }
}

#[async_trait]
impl ArticlesRepo for MemoryRepos {
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.articles.iter().find(|article| article.slug == slug).cloned())
    }

    async fn load_article_detail(&self, id: i64) -> Result<Option<ArticleDetail>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .articles
            .iter()
            .find(|article| article.id == id)
            .map(|article| tables.detail(article)))
    }

    async fn article_slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let tables = self.read()?;
        Ok(tables.articles.iter().any(|article| article.slug == slug))
    }

    async fn list_owner_articles(
        &self,
        user_id: i64,
        visibility: Visibility,
    ) -> Result<Vec<DashboardArticleItem>, RepoError> {
        let tables = self.read()?;
        let mut owned: Vec<&ArticleRecord> = tables
            .articles
            .iter()
            .filter(|article| {
                article.user_id == user_id && article.is_draft == visibility.is_draft()
            })
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .map(|article| DashboardArticleItem {
                title: article.title.clone(),
                slug: article.slug.clone(),
                is_draft: article.is_draft,
                category: tables.category_ref(article.category_id),
            })
            .collect())
    }

    async fn owner_article_stats(&self, user_id: i64) -> Result<ArticleStats, RepoError> {
        let tables = self.read()?;
        Ok(Tables::stats(
            tables.articles.iter().filter(|article| article.user_id == user_id),
        ))
    }

    async fn owner_article_slugs(&self, user_id: i64) -> Result<Vec<String>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .articles
            .iter()
            .filter(|article| article.user_id == user_id)
            .map(|article| article.slug.clone())
            .collect())
    }

    async fn list_published(
        &self,
        filter: &PublishedFilter,
        page: PageRequest,
    ) -> Result<Page<ArticleSummaryRow>, RepoError> {
        let tables = self.read()?;
        let matching: Vec<&ArticleRecord> = tables
            .published_newest_first()
            .into_iter()
            .filter(|article| match filter {
                PublishedFilter::All => true,
                PublishedFilter::Category(id) => article.category_id == *id,
                PublishedFilter::Author(id) => article.user_id == *id,
                PublishedFilter::Search(term) => {
                    let term = term.to_lowercase();
                    article.title.to_lowercase().contains(&term)
                        || article.body.to_lowercase().contains(&term)
                }
            })
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|article| tables.summary(article))
            .collect();
        Ok(Page::new(items, total))
    }

    async fn find_published_detail(&self, slug: &str) -> Result<Option<ArticleDetail>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .articles
            .iter()
            .find(|article| article.slug == slug && !article.is_draft)
            .map(|article| tables.detail(article)))
    }

    async fn related_published(
        &self,
        category_id: i64,
        exclude_slug: &str,
        limit: i64,
    ) -> Result<Vec<ArticleSummaryRow>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .published_newest_first()
            .into_iter()
            .filter(|article| article.category_id == category_id && article.slug != exclude_slug)
            .take(limit as usize)
            .map(|article| tables.summary(article))
            .collect())
    }

    async fn newest_published(&self, limit: i64) -> Result<Vec<ArticleSummaryRow>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .published_newest_first()
            .into_iter()
            .take(limit as usize)
            .map(|article| tables.summary(article))
            .collect())
    }

    async fn all_published_links(&self) -> Result<Vec<ArticleLink>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .published_newest_first()
            .into_iter()
            .map(|article| ArticleLink {
                title: article.title.clone(),
                slug: article.slug.clone(),
                updated_at: article.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl ArticlesWriteRepo for MemoryRepos {
    async fn create_article(&self, params: CreateArticleParams) -> Result<ArticleRecord, RepoError> {
        let mut tables = self.write();
        if tables.articles.iter().any(|article| article.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "articles_slug_key".into(),
            });
        }
        let id = tables.next_id();
        let now = tables.stamp();
        let article = ArticleRecord {
            id,
            title: params.title,
            slug: params.slug,
            body: params.body,
            excerpt: params.excerpt,
            img_thumbnail: params.img_thumbnail,
            is_draft: params.is_draft,
            category_id: params.category_id,
            user_id: params.user_id,
            lang_id: params.lang_id,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(article.clone());
        Ok(article)
    }

    async fn update_article(&self, params: UpdateArticleParams) -> Result<ArticleRecord, RepoError> {
        let mut tables = self.write();
        let now = tables.stamp();
        let article = tables
            .articles
            .iter_mut()
            .find(|article| article.id == params.id)
            .ok_or(RepoError::NotFound)?;
        article.title = params.title;
        article.body = params.body;
        article.excerpt = params.excerpt;
        article.img_thumbnail = params.img_thumbnail;
        article.is_draft = params.is_draft;
        article.category_id = params.category_id;
        article.lang_id = params.lang_id;
        article.updated_at = now;
        Ok(article.clone())
    }

    async fn delete_article(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.write();
        let before = tables.articles.len();
        tables.articles.retain(|article| article.id != id);
        if tables.articles.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.read()?.categories.clone())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.categories.iter().find(|category| category.slug == slug).cloned())
    }

    async fn category_name_taken(&self, name: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .iter()
            .any(|category| category.name == name && Some(category.id) != except))
    }

    async fn category_slug_exists(&self, slug: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .iter()
            .any(|category| category.slug == slug && Some(category.id) != except))
    }

    async fn category_article_stats(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<ArticleStats, RepoError> {
        let tables = self.read()?;
        Ok(Tables::stats(tables.articles.iter().filter(|article| {
            article.category_id == category_id && owner.is_none_or(|owner| article.user_id == owner)
        })))
    }

    async fn list_category_articles(
        &self,
        category_id: i64,
        owner: Option<i64>,
    ) -> Result<Vec<CategoryArticleItem>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .articles
            .iter()
            .filter(|article| {
                article.category_id == category_id
                    && owner.is_none_or(|owner| article.user_id == owner)
            })
            .map(|article| CategoryArticleItem {
                title: article.title.clone(),
                slug: article.slug.clone(),
                is_draft: article.is_draft,
                author: tables.author_ref(article.user_id),
                updated_at: article.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryRepos {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let now = tables.stamp();
        let category = CategoryRecord {
            id,
            name: params.name,
            slug: params.slug,
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tables = self.write();
        let now = tables.stamp();
        let category = tables
            .categories
            .iter_mut()
            .find(|category| category.id == params.id)
            .ok_or(RepoError::NotFound)?;
        category.name = params.name;
        category.slug = params.slug;
        category.updated_at = now;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.write();
        if tables.articles.iter().any(|article| article.category_id == id) {
            return Err(RepoError::Integrity {
                message: "articles_category_id_fkey".into(),
            });
        }
        tables.categories.retain(|category| category.id != id);
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.users.iter().find(|user| user.username == username).cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .users
            .iter()
            .any(|user| user.email == email && Some(user.id) != except))
    }

    async fn username_taken(&self, username: &str, except: Option<i64>) -> Result<bool, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .users
            .iter()
            .any(|user| user.username == username && Some(user.id) != except))
    }

    async fn list_users(&self, exclude: i64) -> Result<Vec<UserSummary>, RepoError> {
        let tables = self.read()?;
        let mut users: Vec<UserSummary> = tables
            .users
            .iter()
            .filter(|user| user.id != exclude)
            .map(|user| UserSummary {
                name: user.name.clone(),
                username: user.username.clone(),
                email: user.email.clone(),
                image: user.image.clone(),
                is_admin: user.is_admin,
                articles_count: tables
                    .articles
                    .iter()
                    .filter(|article| article.user_id == user.id)
                    .count() as u64,
                updated_at: user.updated_at,
            })
            .collect();
        users.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(users)
    }

    async fn user_article_count(&self, user_id: i64) -> Result<u64, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .articles
            .iter()
            .filter(|article| article.user_id == user_id)
            .count() as u64)
    }

    async fn user_category_counts(
        &self,
        user_id: i64,
    ) -> Result<Vec<CategoryArticleCount>, RepoError> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .iter()
            .filter_map(|category| {
                let count = tables
                    .articles
                    .iter()
                    .filter(|article| article.user_id == user_id && article.category_id == category.id)
                    .count() as u64;
                (count > 0).then(|| CategoryArticleCount {
                    category: tables.category_ref(category.id),
                    articles_count: count,
                })
            })
            .collect())
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryRepos {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.write();
        let id = tables.next_id();
        let now = tables.stamp();
        let user = UserRecord {
            id,
            name: params.name,
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            is_admin: params.is_admin,
            image: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.write();
        let now = tables.stamp();
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.name = params.name;
        user.username = params.username;
        user.email = params.email;
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_image(&self, id: i64, image: Option<&str>) -> Result<Option<String>, RepoError> {
        let mut tables = self.write();
        let user = tables
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        Ok(std::mem::replace(&mut user.image, image.map(str::to_string)))
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.write();
        if tables.articles.iter().any(|article| article.user_id == id) {
            return Err(RepoError::Integrity {
                message: "articles_user_id_fkey".into(),
            });
        }
        tables.users.retain(|user| user.id != id);
        Ok(())
    }
}

#[async_trait]
impl LanguagesRepo for MemoryRepos {
    async fn list_languages(&self) -> Result<Vec<LanguageRecord>, RepoError> {
        Ok(self.read()?.languages.clone())
    }

    async fn find_language(&self, id: i64) -> Result<Option<LanguageRecord>, RepoError> {
        let tables = self.read()?;
        Ok(tables.languages.iter().find(|lang| lang.id == id).cloned())
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }
}

/// A store whose every operation fails, as when Redis is unreachable.
pub struct DownStore;

#[async_trait]
impl CacheStore for DownStore {
    async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: String,
        _ttl: Option<StdDuration>,
    ) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }

    async fn flush(&self) -> Result<(), CacheStoreError> {
        Err(CacheStoreError::Unavailable("connection refused".into()))
    }
}

/// Services wired to one [`MemoryRepos`] and one cache store.
pub struct Harness {
    pub repos: Arc<MemoryRepos>,
    pub store: Arc<dyn CacheStore>,
    pub cache: CacheLayer,
    pub auth: AuthService,
    pub articles: ArticleService,
    pub public: PublicArticleService,
    pub categories: CategoryService,
    pub users: UserService,
    pub languages: LanguageService,
    pub uploads: Arc<UploadStorage>,
    pub passwords: PasswordHashing,
    _uploads_dir: TempDir,
}

impl Harness {
    pub fn new(policy: InvalidationPolicy) -> Self {
        let config = CacheConfig {
            policy,
            ..CacheConfig::default()
        };
        Self::with_store(Arc::new(MemoryStore::new(&config)), policy)
    }

    pub fn with_store(store: Arc<dyn CacheStore>, policy: InvalidationPolicy) -> Self {
        let config = CacheConfig {
            policy,
            ..CacheConfig::default()
        };
        let cache = CacheLayer::new(store.clone(), &config).expect("default namespace is valid");

        let repos = Arc::new(MemoryRepos::default());
        let dir = tempfile::tempdir().expect("temp dir");
        let uploads = Arc::new(
            UploadStorage::new(dir.path().to_path_buf(), 64 * 1024, PUBLIC_URL)
                .expect("upload root"),
        );
        let passwords = PasswordHashing::with_params(8, 1, 1).expect("argon2 params");
        let jwt = Arc::new(JwtKeys::new(JWT_SECRET, 60));
        let listing_url = Url::parse(PUBLIC_URL)
            .and_then(|base| base.join("articles/public"))
            .expect("listing url");

        Self {
            auth: AuthService::new(repos.clone(), jwt, passwords.clone()),
            articles: ArticleService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                repos.clone(),
                uploads.clone(),
                cache.clone(),
            ),
            public: PublicArticleService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                cache.clone(),
                listing_url,
                PER_PAGE,
            ),
            categories: CategoryService::new(repos.clone(), repos.clone(), cache.clone()),
            users: UserService::new(
                repos.clone(),
                repos.clone(),
                passwords.clone(),
                uploads.clone(),
                cache.clone(),
            ),
            languages: LanguageService::new(repos.clone()),
            repos,
            store,
            cache,
            uploads,
            passwords,
            _uploads_dir: dir,
        }
    }

    /// Seeds a user whose password is [`PASSWORD`].
    pub fn user(&self, username: &str, is_admin: bool) -> UserRecord {
        let hash = self.passwords.hash(PASSWORD).expect("hash");
        self.repos.seed_user(username, &hash, is_admin)
    }

    pub async fn cached(&self, key: impl AsRef<str>) -> bool {
        self.store.exists(key.as_ref()).await.expect("memory store")
    }

    pub fn app_state(&self, client_keys: &[&str]) -> AppState {
        AppState {
            auth: Arc::new(self.auth.clone()),
            articles: Arc::new(self.articles.clone()),
            public_articles: Arc::new(self.public.clone()),
            categories: Arc::new(self.categories.clone()),
            users: Arc::new(self.users.clone()),
            languages: Arc::new(self.languages.clone()),
            cache: self.cache.clone(),
            uploads: self.uploads.clone(),
            health: self.repos.clone(),
            client_keys: Arc::new(ClientKeys::new(client_keys.iter().copied())),
            login_limiter: Arc::new(ApiRateLimiter::new(StdDuration::from_secs(120), 20)),
        }
    }
}

pub fn principal(user: &UserRecord) -> Principal {
    Principal {
        user_id: user.id,
        role: Role::from_is_admin(user.is_admin),
    }
}

pub fn command(title: &str, category: &CategoryRecord, is_draft: bool) -> ArticleCommand {
    ArticleCommand {
        title: title.to_string(),
        body: format!("{title} body"),
        excerpt: None,
        img_thumbnail: None,
        is_draft,
        category: category.slug.clone(),
        lang_id: None,
    }
}
