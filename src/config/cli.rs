use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the inkpost binary.
#[derive(Debug, Parser)]
#[command(name = "inkpost", version, about = "inkpost CMS backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INKPOST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
    /// Drop every cached entry and exit.
    #[command(name = "flush-cache")]
    FlushCache(FlushCacheArgs),
    /// Create an administrator account.
    #[command(name = "create-admin")]
    CreateAdmin(CreateAdminArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CacheOverrides {
    /// Override the cache backend (memory|redis).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the invalidation policy (surgical|flush).
    #[arg(long = "cache-policy", value_name = "POLICY")]
    pub cache_policy: Option<String>,

    /// Override the entry lifetime; 0 keeps entries until invalidated.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(flatten)]
    pub cache: CacheOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the externally visible base URL.
    #[arg(long = "server-public-url", value_name = "URL")]
    pub public_url: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the access token lifetime.
    #[arg(long = "auth-token-ttl-minutes", value_name = "MINUTES")]
    pub token_ttl_minutes: Option<u64>,

    /// Override the uploads directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum accepted image size in bytes.
    #[arg(long = "uploads-max-image-bytes", value_name = "BYTES")]
    pub uploads_max_image_bytes: Option<u64>,

    /// Override the login rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the login rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,

    /// Override the public listing page size.
    #[arg(long = "pagination-per-page", value_name = "COUNT")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FlushCacheArgs {
    #[command(flatten)]
    pub cache: CacheOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CreateAdminArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "NAME")]
    pub name: String,

    #[arg(long, value_name = "USERNAME")]
    pub username: String,

    #[arg(long, value_name = "EMAIL")]
    pub email: String,

    /// Initial password; read from the environment to keep it out of shell history.
    #[arg(long, env = "INKPOST_ADMIN_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    pub password: String,
}
