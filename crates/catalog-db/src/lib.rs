//! # catalog-db: Database Layer for Catalog Sync
//!
//! Local product storage on SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Catalog Sync Data Flow                           │
//! │                                                                         │
//! │  ProductWriter / ImportReconciler (catalog-sync)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   catalog-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repository   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_create_  │  │   │
//! │  │   │ ReadPolicy    │    │ ProductTx     │    │ products.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`policy`] - Read-visibility policy applied to lookups
//! - [`error`] - Database error types
//! - [`repository`] - Product repository and write transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_db::{Database, DbConfig, Lookup};
//!
//! let db = Database::new(DbConfig::new("catalog.db")).await?;
//!
//! match db.products().find_by_name("Widget").await? {
//!     Lookup::Found(product) => println!("{}", product.id),
//!     Lookup::Denied | Lookup::NotFound => println!("not visible"),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod policy;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use policy::{AllowAll, ReadPolicy};
pub use pool::{Database, DbConfig};
pub use repository::product::{ProductRepository, ProductTransaction};
pub use repository::Lookup;
