use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use publishing_service::config::StorageBackend;
use publishing_service::db::{MemoryStore, Repositories};
use publishing_service::handlers;
use publishing_service::jobs::start_like_reconciler;
use publishing_service::middleware::JwtKeys;
use publishing_service::{AppState, Config};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Publishing Service
///
/// # Routes
///
/// - `/api/v1/posts/*` - Save, read, search and count posts; trending
/// - `/api/v1/likes/*` - Toggle and query likes
/// - `/api/v1/authors/*` - Profiles, author search and profile edits
/// - `/api/v1/health*`, `/metrics`
///
/// Runs on port 8082 by default (PUBLISHING_SERVICE_PORT).
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            anyhow::bail!("failed to load configuration: {}", e);
        }
    };

    tracing::info!(
        env = %config.app.env,
        storage = ?config.storage,
        "Starting publishing-service"
    );

    let (repos, pool) = match config.storage {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&config.database.url)
                .await
                .context("failed to connect to PostgreSQL")?;

            if config.database.run_migrations {
                sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .context("failed to run database migrations")?;
                tracing::info!("Database migrations applied");
            }

            (Repositories::postgres(pool.clone()), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            (Repositories::in_memory(Arc::new(MemoryStore::new())), None)
        }
    };

    let mut state = AppState::new(repos, config.listing.into());
    if let Some(pool) = pool {
        state = state.with_pool(pool);
    }

    let reconciler = if config.jobs.like_reconcile_interval_secs > 0 {
        Some(tokio::spawn(start_like_reconciler(
            state.engagement.clone(),
            Duration::from_secs(config.jobs.like_reconcile_interval_secs),
            config.jobs.like_reconcile_batch_size,
        )))
    } else {
        tracing::info!("Like reconciler disabled");
        None
    };

    let state = web::Data::new(state);
    let jwt_keys = web::Data::new(JwtKeys::from_secret(&config.auth.jwt_secret));
    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let cors_config = config.cors.clone();

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_config.origins() {
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(jwt_keys.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .disable_signals()
    .run();

    tracing::info!("HTTP server listening on {}", bind_address);

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    server_handle.stop(true).await;
    if let Some(reconciler) = reconciler {
        reconciler.abort();
    }

    match server_task.await {
        Ok(result) => result.context("HTTP server error")?,
        Err(e) => tracing::error!("HTTP server task join error: {}", e),
    }

    tracing::info!("Publishing-service shutting down");
    Ok(())
}
