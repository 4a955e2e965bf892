use std::sync::Arc;

use crate::application::articles::ArticleService;
use crate::application::auth::AuthService;
use crate::application::categories::CategoryService;
use crate::application::languages::LanguageService;
use crate::application::public_articles::PublicArticleService;
use crate::application::repos::HealthRepo;
use crate::application::users::UserService;
use crate::cache::CacheLayer;
use crate::infra::uploads::UploadStorage;

use super::middleware::ClientKeys;
use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub articles: Arc<ArticleService>,
    pub public_articles: Arc<PublicArticleService>,
    pub categories: Arc<CategoryService>,
    pub users: Arc<UserService>,
    pub languages: Arc<LanguageService>,
    pub cache: CacheLayer,
    pub uploads: Arc<UploadStorage>,
    pub health: Arc<dyn HealthRepo>,
    pub client_keys: Arc<ClientKeys>,
    pub login_limiter: Arc<ApiRateLimiter>,
}
