//! # Catalog Admin API
//!
//! HTTP server for product administration and remote catalog import.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Admin API Server                                 │
//! │                                                                         │
//! │  Admin UI ───► HTTP (8080) ───► ProductWriter ───► SQLite               │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                                Billy / ERP API                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use catalog_admin_api::{router, AdminConfig, AppState};
use catalog_db::{Database, DbConfig};
use catalog_sync::{lock, remote, SyncConfig};

const DEFAULT_LOG_FILTER: &str = "info,catalog=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting catalog admin API...");

    // Load configuration
    let config = AdminConfig::load()?;
    let sync_config = SyncConfig::load(config.sync_config_path.clone())
        .context("Failed to load sync configuration")?;
    info!(
        port = config.port,
        database = %config.database_path.display(),
        remote = %sync_config.remote.backend,
        locks = %sync_config.lock.backend,
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(DbConfig::new(config.database_path.clone()))
        .await
        .context("Failed to open database")?;

    // Remote catalog and lock service
    let remote = remote::from_config(&sync_config)?;
    let locks = lock::from_config(&sync_config)?;

    let state = AppState::new(db.clone(), remote, locks, &sync_config)?;
    let app = router(state);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "Admin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
