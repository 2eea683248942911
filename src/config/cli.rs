use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the jobboard binary.
#[derive(Debug, Parser)]
#[command(name = "jobboard", version, about = "Job board backend")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "JOBBOARD_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub external: ExternalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service (default).
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

/// Credentials for external services, conventionally supplied through the
/// environment. Accepted for every command.
#[derive(Debug, Args, Default, Clone)]
pub struct ExternalOverrides {
    /// Upstash Redis REST endpoint.
    #[arg(
        long = "cache-rest-url",
        env = "UPSTASH_REDIS_REST_URL",
        value_name = "URL",
        global = true
    )]
    pub cache_rest_url: Option<String>,

    /// Upstash Redis REST token.
    #[arg(
        long = "cache-rest-token",
        env = "UPSTASH_REDIS_REST_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub cache_rest_token: Option<String>,

    /// Secret used to sign access tokens.
    #[arg(
        long = "access-token-secret",
        env = "ACCESS_TOKEN_SECRET",
        value_name = "SECRET",
        hide_env_values = true,
        global = true
    )]
    pub access_token_secret: Option<String>,

    /// Secret used to sign refresh tokens.
    #[arg(
        long = "refresh-token-secret",
        env = "REFRESH_TOKEN_SECRET",
        value_name = "SECRET",
        hide_env_values = true,
        global = true
    )]
    pub refresh_token_secret: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the uploads directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Enable or disable the listing cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the TTL of cached listing pages.
    #[arg(long = "cache-listing-ttl-seconds", value_name = "SECONDS")]
    pub cache_listing_ttl_seconds: Option<u64>,

    /// Override the per-call cache store timeout.
    #[arg(long = "cache-timeout-ms", value_name = "MILLIS")]
    pub cache_timeout_ms: Option<u64>,
}
