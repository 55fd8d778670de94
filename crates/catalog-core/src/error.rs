//! # Error Types
//!
//! Domain-specific error types for catalog-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  catalog-core errors (this file)                                        │
//! │  ├── CoreError        - Domain invariant violations                     │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  catalog-db errors                                                      │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  catalog-sync errors                                                    │
//! │  └── SyncError        - Remote, lock and write path failures            │
//! │                                                                         │
//! │  admin-api errors                                                       │
//! │  └── ApiError         - What the HTTP caller sees                       │
//! │                                                                         │
//! │  Flow: ValidationError → SyncError → ApiError → HTTP response           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain invariant violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product that already carries a remote id was handed a different one.
    ///
    /// ## When This Occurs
    /// - The remote system answered an update with a new identifier
    ///
    /// The remote id is assigned once, on the first successful push, and
    /// never changes for the life of the local record.
    #[error("Remote id of product '{name}' cannot change from {current} to {proposed}")]
    RemoteIdChanged {
        name: String,
        current: String,
        proposed: String,
    },

    /// The remote system answered a push without an identifier.
    #[error("Remote system returned an empty id for product '{name}'")]
    EmptyRemoteId { name: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any lock is taken or any remote call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Duplicate value (another product already uses this name).
    #[error("There is already a product with the given {field} \"{value}\"")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Returns true for uniqueness violations.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ValidationError::Duplicate { .. })
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
