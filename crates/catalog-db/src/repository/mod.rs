//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ImportReconciler / admin-api                                           │
//! │       │  db.products().find_by_name("Widget")                           │
//! │       ▼                                                                 │
//! │  ProductRepository  (pool, read-only lookups)                           │
//! │  ├── get_by_id / find_by_name / find_by_remote_id → Lookup<Product>     │
//! │  ├── list / count                                                       │
//! │  └── begin() ─────────────┐                                             │
//! │                           ▼                                             │
//! │  ProductTransaction  (one connection, ProductWriter only)               │
//! │  ├── get_by_id / find_by_name                                           │
//! │  ├── insert / update / delete                                           │
//! │  └── commit  (drop without commit = rollback)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod product;

use crate::policy::ReadPolicy;
use catalog_core::Product;

// =============================================================================
// Lookup Outcome
// =============================================================================

/// Outcome of a single-row lookup.
///
/// "Nothing there" and "there but not visible" are ordinary values, not
/// errors; each caller decides how to treat `Denied`.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Denied,
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Lookup::Denied)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    /// Returns the visible row, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Denied | Lookup::NotFound => None,
        }
    }
}

impl Lookup<Product> {
    /// Classifies a fetched row through the read policy.
    pub(crate) fn classify(row: Option<Product>, policy: &dyn ReadPolicy) -> Self {
        match row {
            None => Lookup::NotFound,
            Some(product) if policy.can_read(&product) => Lookup::Found(product),
            Some(product) => {
                tracing::debug!(product_id = product.id, "Product hidden by read policy");
                Lookup::Denied
            }
        }
    }
}
