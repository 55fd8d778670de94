//! # catalog-core: Pure Domain Logic for Catalog Sync
//!
//! Everything about a product that can be decided without touching the
//! database, the network or a lock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Catalog Sync Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 admin-api (axum endpoints)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       catalog-sync (ProductWriter, ImportReconciler)            │   │
//! │  └──────────────┬─────────────────────────────────┬────────────────┘   │
//! │                 │                                 │                     │
//! │  ┌──────────────▼──────────────┐   ┌──────────────▼────────────────┐   │
//! │  │  ★ catalog-core (HERE) ★    │   │  catalog-db (SQLite)          │   │
//! │  │  Product, RemoteProduct     │   │  ProductRepository            │   │
//! │  │  CatalogFields, field map   │   │                               │   │
//! │  │  validation                 │   │                               │   │
//! │  └─────────────────────────────┘   └───────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, ProductInput, RemoteProduct, the accessor contract
//! - [`mapping`] - Static remote accessor → local field table
//! - [`validation`] - Field rules (required name, max length, page size)
//! - [`error`] - Domain error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod mapping;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use mapping::{FieldMapping, FieldValue, ProductField, REMOTE_FIELD_MAP};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a product name, in characters.
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Page size used when paging through a remote catalog unless configured.
pub const DEFAULT_IMPORT_PAGE_SIZE: u32 = 10;

/// Upper bound accepted for a configured import page size.
///
/// Billy rejects page sizes above 1000.
pub const MAX_IMPORT_PAGE_SIZE: u32 = 1000;
