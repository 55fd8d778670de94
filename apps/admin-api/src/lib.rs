//! # Catalog Admin API
//!
//! HTTP endpoints for catalog administration.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Admin API Services                              │
//! │                                                                         │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │  Product CRUD      │  │  Import / Export   │  │  Health          │  │
//! │  │                    │  │                    │  │                  │  │
//! │  │ • list             │  │ • import-from-erp  │  │ • pool check     │  │
//! │  │ • create / update  │  │ • export-to-erp    │  │ • migrations     │  │
//! │  │ • delete           │  │   (always 501)     │  │                  │  │
//! │  └─────────┬──────────┘  └─────────┬──────────┘  └──────────────────┘  │
//! │            ▼                       ▼                                    │
//! │     ProductWriter           ImportReconciler        (catalog-sync)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `ADMIN_BIND_ADDR` - Interface to bind (default: 127.0.0.1)
//! - `ADMIN_PORT` - HTTP port (default: 8080)
//! - `CATALOG_DATABASE_PATH` - SQLite file (default: catalog.db)
//! - `CATALOG_SYNC_CONFIG` - Sync TOML file (default: platform config dir)
//! - `RUST_LOG` - Log filter (default: `info,catalog=debug,sqlx=warn`)

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use catalog_db::Database;
use catalog_sync::{ImportReconciler, LockService, ProductWriter, RemoteCatalog, SyncConfig, SyncResult};

// Re-exports
pub use config::AdminConfig;
pub use error::ApiError;
pub use routes::router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub writer: ProductWriter,
    pub reconciler: ImportReconciler,
}

impl AppState {
    /// Wires the write path and the reconciler to one remote catalog.
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteCatalog>,
        locks: Arc<dyn LockService>,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        let writer = ProductWriter::new(db.clone(), remote.clone(), locks, config.defaults.clone());
        let reconciler = ImportReconciler::new(
            db.clone(),
            remote,
            writer.clone(),
            config.import.page_size,
        )?;

        Ok(AppState {
            db,
            writer,
            reconciler,
        })
    }
}
