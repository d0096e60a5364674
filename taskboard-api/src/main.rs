//! # Taskboard API Server
//!
//! Multi-tenant Kanban API: boards, tasks and comments behind bearer-token
//! authentication.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... DATABASE_URL=postgres://... cargo run -p taskboard-api
//! STORAGE_BACKEND=memory JWT_SECRET=... cargo run -p taskboard-api
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use taskboard_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StorageBackend},
};
use taskboard_shared::{
    auth::password::HashParams,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{InMemoryStore, PgStore, ResourceStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let (store, pool) = open_store(&config).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(store, config, HashParams::default());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(&pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskboard_api=debug,taskboard_shared=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Opens the configured resource store; the pool is returned so it can be closed on shutdown
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn ResourceStore>, Option<PgPool>)> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;

            let pool = create_pool(&DatabaseConfig::new(url, config.storage.max_connections)).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok((Arc::new(PgStore::new(pool.clone())), Some(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; all data is lost on shutdown");
            Ok((Arc::new(InMemoryStore::new()), None))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
