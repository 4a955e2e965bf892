use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc};

use inkpost::{
    application::{
        articles::ArticleService,
        auth::AuthService,
        categories::CategoryService,
        error::AppError,
        languages::LanguageService,
        public_articles::PublicArticleService,
        repos::{
            ArticlesRepo, ArticlesWriteRepo, CategoriesRepo, CategoriesWriteRepo,
            CreateUserParams, HealthRepo, LanguagesRepo, UsersRepo, UsersWriteRepo,
        },
        users::UserService,
    },
    cache::{
        CacheBackend, CacheConfig, CacheLayer, CacheStore, InvalidationPlan, MemoryStore,
        RedisStore,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiRateLimiter, AppState, ClientKeys, api::models::UserCreateRequest},
        security::{JwtKeys, PasswordHashing},
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use validator::Validate;

const PUBLIC_LISTING_PATH: &str = "articles/public";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::FlushCache(_) => run_flush_cache(settings).await,
        config::Command::CreateAdmin(args) => run_create_admin(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let jwt_secret = settings
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| InfraError::configuration("auth.jwt_secret is required to serve"))?;

    let repositories = init_repositories(&settings).await?;
    let cache = build_cache_layer(&settings.cache)?;

    let uploads = Arc::new(UploadStorage::new(
        settings.uploads.directory.clone(),
        settings.uploads.max_image_bytes.get(),
        settings.server.public_url.as_str(),
    )
    .map_err(InfraError::Uploads)?);
    let listing_url = settings
        .server
        .public_endpoint(PUBLIC_LISTING_PATH)
        .map_err(|err| InfraError::configuration(format!("invalid server.public_url: {err}")))?;

    let ttl_minutes = i64::try_from(settings.auth.token_ttl_minutes.get())
        .map_err(|_| InfraError::configuration("auth.token_ttl_minutes is too large"))?;
    let jwt = Arc::new(JwtKeys::new(jwt_secret, ttl_minutes));
    let passwords = PasswordHashing::default();

    let articles_repo: Arc<dyn ArticlesRepo> = repositories.clone();
    let articles_write_repo: Arc<dyn ArticlesWriteRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let users_write_repo: Arc<dyn UsersWriteRepo> = repositories.clone();
    let languages_repo: Arc<dyn LanguagesRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories.clone();

    let state = AppState {
        auth: Arc::new(AuthService::new(users_repo.clone(), jwt, passwords.clone())),
        articles: Arc::new(ArticleService::new(
            articles_repo.clone(),
            articles_write_repo,
            categories_repo.clone(),
            languages_repo.clone(),
            uploads.clone(),
            cache.clone(),
        )),
        public_articles: Arc::new(PublicArticleService::new(
            articles_repo,
            categories_repo.clone(),
            users_repo.clone(),
            cache.clone(),
            listing_url,
            settings.pagination.per_page.get(),
        )),
        categories: Arc::new(CategoryService::new(
            categories_repo,
            categories_write_repo,
            cache.clone(),
        )),
        users: Arc::new(UserService::new(
            users_repo,
            users_write_repo,
            passwords,
            uploads.clone(),
            cache.clone(),
        )),
        languages: Arc::new(LanguageService::new(languages_repo)),
        cache,
        uploads,
        health: health_repo,
        client_keys: Arc::new(ClientKeys::new(&settings.auth.client_keys)),
        login_limiter: Arc::new(ApiRateLimiter::new(
            std::time::Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
            settings.rate_limit.max_requests.get(),
        )),
    };

    if !state.client_keys.is_enabled() {
        warn!("no client keys configured; public endpoints accept any caller");
    }

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(addr = %settings.server.addr, public_url = %settings.server.public_url, "listening");

    let signalled = Arc::new(Notify::new());
    let notify = signalled.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        notify.notify_one();
    })
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::from(InfraError::Serve(err)));
        }
        () = signalled.notified() => {}
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::from(InfraError::Serve(err))),
        Err(_) => {
            warn!(
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!("migrations applied");
    Ok(())
}

async fn run_flush_cache(settings: config::Settings) -> Result<(), AppError> {
    if settings.cache.backend == CacheBackend::Memory {
        warn!("memory cache lives inside the server process; nothing to flush from here");
        return Ok(());
    }

    let cache = build_cache_layer(&settings.cache)?;
    cache
        .invalidator
        .execute(&InvalidationPlan::flush())
        .await
        .map_err(InfraError::from)?;

    info!("cache flushed");
    Ok(())
}

async fn run_create_admin(
    settings: config::Settings,
    args: config::CreateAdminArgs,
) -> Result<(), AppError> {
    let request = UserCreateRequest {
        name: args.name,
        username: args.username,
        email: args.email,
        password: args.password,
        is_admin: true,
    };
    request
        .validate()
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let repositories = init_repositories(&settings).await?;
    if repositories.username_taken(&request.username, None).await? {
        return Err(AppError::validation(
            "username",
            "The username has already been taken",
        ));
    }
    if repositories.email_taken(&request.email, None).await? {
        return Err(AppError::validation("email", "The email has already been taken"));
    }

    let password_hash = PasswordHashing::default()
        .hash(&request.password)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    let user = repositories
        .create_user(CreateUserParams {
            name: request.name,
            username: request.username,
            email: request.email,
            password_hash,
            is_admin: true,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "administrator created");
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_cache_layer(settings: &config::CacheSettings) -> Result<CacheLayer, AppError> {
    let config = CacheConfig::from(settings);

    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new(&config)),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is not configured"))?;
            Arc::new(
                RedisStore::connect(url)
                    .map_err(InfraError::from)?
                    .with_key_prefix(config.redis_key_prefix.clone()),
            )
        }
    };

    info!(
        backend = ?config.backend,
        policy = ?config.policy,
        ttl_seconds = config.ttl_seconds,
        "cache configured"
    );

    CacheLayer::new(store, &config)
        .map_err(|err| InfraError::configuration(format!("invalid cache namespace: {err}")).into())
}
