use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod model;
pub mod routes;
pub mod services;
pub mod storage;

use config::{Config, StorageBackend};
use context::AppContext;
use storage::memory::InMemoryStore;
use storage::postgres::PostgresStore;
use storage::StorageGateway;

/// Serves the application router on an already-bound listener. Split out of
/// `run` so tests can spawn the server on an ephemeral port.
pub async fn run_http_server(app_context: AppContext, listener: TcpListener) -> Result<()> {
    let app = routes::create_router(Arc::new(app_context));
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    let storage: Arc<dyn StorageGateway> = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
        StorageBackend::Postgres => Arc::new(PostgresStore::connect(&config.db).await?),
    };

    let app_context = AppContext::new(storage, config.clone());

    let bind_address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_address).await?;
    run_http_server(app_context, listener).await?;
    Ok(())
}
