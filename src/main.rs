//! Autostelle Server - parking access admin panel backend

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use autostelle_server::{
    api,
    config::{AppConfig, LoggingConfig, StoreBackend},
    realtime::{FirebaseStore, MemoryStore, RealtimeStore},
    repository::Repository,
    services::{identity::FirebaseIdentity, redis::RedisService, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Autostelle Server v{}", env!("CARGO_PKG_VERSION"));

    // Realtime store
    let store: Arc<dyn RealtimeStore> = match config.store.backend {
        StoreBackend::Firebase => {
            tracing::info!("Using realtime database at {}", config.store.database_url);
            Arc::new(FirebaseStore::new(&config.store).context("Failed to create store client")?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let repository = Repository::new(store);

    // Initialize Redis connection
    let redis_service = RedisService::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    tracing::info!("Connected to Redis");

    let identity = FirebaseIdentity::new(config.identity.clone());
    let services = Services::new(
        repository,
        &config,
        Arc::new(identity),
        Arc::new(redis_service),
    );

    // Save server address before moving config
    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Install the tracing subscriber; the guard flushes the log file on drop
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("autostelle_server={},tower_http=debug", logging.level).into());

    let (writer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "autostelle.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let fmt_layer = match (logging.format.as_str(), writer) {
        ("json", Some(writer)) => tracing_subscriber::fmt::layer().json().with_writer(writer).boxed(),
        ("json", None) => tracing_subscriber::fmt::layer().json().boxed(),
        (_, Some(writer)) => tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer).boxed(),
        (_, None) => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    guard
}
