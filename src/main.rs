use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use jobboard::{
    application::{
        auth::{TokenConfig, TokenIssuer},
        error::AppError,
        jobs::JobService,
        resumes::ResumeService,
        users::UserService,
    },
    cache::{CacheAccess, CacheConfig, UpstashStore},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        telemetry,
        uploads::UploadStorage,
    },
};
use sqlx::PgPool;
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let token_config = TokenConfig::try_from(&settings.auth)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let pool = connect_and_migrate(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let cache = build_cache(&settings.cache)?;
    let upload_storage = Arc::new(
        UploadStorage::new(
            settings.uploads.directory.clone(),
            settings.uploads.max_request_bytes.get(),
        )
        .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let tokens = Arc::new(TokenIssuer::new(token_config));
    let api_state = ApiState {
        users: Arc::new(UserService::new(repositories.clone(), tokens)),
        jobs: Arc::new(JobService::new(repositories.clone(), cache.clone())),
        resumes: Arc::new(ResumeService::new(
            repositories.clone(),
            upload_storage.clone(),
        )),
        cache,
        max_upload_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
            .unwrap_or(usize::MAX),
    };
    let http_state = HttpState {
        health: repositories,
        upload_storage,
    };

    serve_http(
        &settings,
        RouterState {
            http: http_state,
            api: api_state,
        },
    )
    .await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_and_migrate(&settings).await?;
    pool.close().await;
    info!(target = "jobboard::migrate", "migrations applied");
    Ok(())
}

async fn connect_and_migrate(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(pool)
}

fn build_cache(settings: &config::CacheSettings) -> Result<CacheAccess, AppError> {
    if !settings.enabled {
        info!(target = "jobboard::cache", "cache disabled by configuration");
        return Ok(CacheAccess::disabled());
    }

    let Some(url) = settings.rest_url.as_deref() else {
        warn!(
            target = "jobboard::cache",
            "no cache REST URL configured; serving every read from the database"
        );
        return Ok(CacheAccess::disabled());
    };

    let token = settings.rest_token.clone().ok_or_else(|| {
        InfraError::configuration("cache.rest_token is required when cache.rest_url is set")
    })?;
    let store = UpstashStore::new(url, token).map_err(InfraError::from)?;
    let config = CacheConfig::from(settings);

    info!(
        target = "jobboard::cache",
        listing_ttl_seconds = config.listing_ttl_seconds,
        default_ttl_seconds = config.default_ttl_seconds,
        timeout_ms = config.timeout_ms,
        "cache enabled"
    );
    Ok(CacheAccess::new(Arc::new(store), config))
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "jobboard::http",
        addr = %settings.server.addr,
        "listening"
    );

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let shutdown = async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    };
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = drain_deadline(signalled_rx, settings.server.graceful_shutdown) => {
            warn!(
                target = "jobboard::http",
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

/// Resolves `grace` after the shutdown signal fires; never resolves otherwise.
async fn drain_deadline(signalled: oneshot::Receiver<()>, grace: Duration) {
    if signalled.await.is_ok() {
        tokio::time::sleep(grace).await;
    } else {
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "jobboard::http", error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!(target = "jobboard::http", "shutdown signal received");
}
