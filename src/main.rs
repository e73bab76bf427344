//! Bike rental server
//!
//! REST API backing the rider app and the admin dashboard.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use bike_rental_server::{
    config::{AppConfig, LoggingConfig, StoreBackend},
    create_router,
    repository::{MemoryStore, Repository, RestStore},
    services::Services,
    AppState,
};

/// Install the tracing subscriber; the returned guard flushes the log file
fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("bike_rental_server={},tower_http=debug", logging.level).into()
    });

    let stdout = if logging.format == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "bike-rental-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting bike rental server v{}", env!("CARGO_PKG_VERSION"));

    let repository: Repository = match config.store.backend {
        StoreBackend::Rest => {
            tracing::info!("Using REST store at {}", config.store.base_url);
            Arc::new(RestStore::new(&config.store).context("Failed to create store client")?)
        }
        StoreBackend::Memory => match &config.store.seed_file {
            Some(path) => Arc::new(
                MemoryStore::from_seed_file(path).context("Failed to load seed data")?,
            ),
            None => {
                tracing::warn!("In-memory store without seed data");
                Arc::new(MemoryStore::new())
            }
        },
    };

    let services = Services::new(repository, &config);

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
