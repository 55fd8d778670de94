//! # catalog-sync: Remote Catalog Synchronisation
//!
//! Keeps the local product store and a remote catalog (Billy or an ERP) in
//! step. Every local write goes through one locked, validated path that
//! pushes to the remote catalog before it commits.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Catalog Sync Architecture                          │
//! │                                                                         │
//! │   admin endpoints                                                       │
//! │      │                    │                                             │
//! │      │ create/update/     │ import / export                             │
//! │      │ delete             ▼                                             │
//! │      │          ┌──────────────────┐   list pages   ┌────────────────┐  │
//! │      │          │ ImportReconciler │───────────────►│ RemoteCatalog  │  │
//! │      │          └────────┬─────────┘                │                │  │
//! │      │                   │ import writes            │ Billy / ERP /  │  │
//! │      ▼                   ▼                          │ in-memory      │  │
//! │   ┌──────────────────────────────┐   push / delete  │                │  │
//! │   │        ProductWriter         │─────────────────►│                │  │
//! │   │                              │                  └────────────────┘  │
//! │   │  LockService (per name)      │                                      │
//! │   │  catalog-db transaction      │                                      │
//! │   └──────────────────────────────┘                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Sync configuration (backends, defaults, page size, locks)
//! - [`error`] - Sync error types
//! - [`lock`] - Named exclusive locks (in-process, Redis)
//! - [`reconciler`] - Import from the remote catalog, disabled export
//! - [`remote`] - Remote catalog clients
//! - [`writer`] - The product write and delete path
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_sync::{lock, remote, ImportReconciler, ProductWriter, SyncConfig};
//!
//! let config = SyncConfig::load(None)?;
//! let remote = remote::from_config(&config)?;
//! let locks = lock::from_config(&config)?;
//!
//! let writer = ProductWriter::new(db.clone(), remote.clone(), locks, config.defaults.clone());
//! let reconciler = ImportReconciler::new(db, remote, writer, config.import.page_size)?;
//!
//! let report = reconciler.import_from_remote().await?;
//! println!("{}", report.message());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod lock;
pub mod reconciler;
pub mod remote;
pub mod writer;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{LockBackend, RemoteBackend, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use lock::{lock_key_for_name, LocalLockService, LockGuard, LockService, RedisLockService};
pub use reconciler::{ImportReconciler, ImportReport, EXPORT_DISABLED_MESSAGE};
pub use remote::{BillyCatalog, ErpCatalog, InMemoryCatalog, RemoteCatalog};
pub use writer::{ProductWriter, WriteOrigin, WriteRequest};
