//! # Read-Visibility Policy
//!
//! Decides whether a stored product may be shown to the current caller.
//!
//! ```text
//! row exists?  ──no──►  Lookup::NotFound
//!     │
//!    yes
//!     ▼
//! can_read()?  ──no──►  Lookup::Denied
//!     │
//!    yes
//!     ▼
//! Lookup::Found(product)
//! ```
//!
//! The repository reports `Denied` instead of hiding the row, so callers
//! decide what a hidden row means: the write path counts it as a name
//! conflict, the import dedup counts it as absent.

use std::fmt::Debug;

use catalog_core::Product;

/// Read-visibility check applied to every repository lookup.
pub trait ReadPolicy: Send + Sync + Debug {
    fn can_read(&self, product: &Product) -> bool;
}

/// Policy that lets every row through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ReadPolicy for AllowAll {
    fn can_read(&self, _product: &Product) -> bool {
        true
    }
}
