//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Write path    │  │     Remote              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Validation     │  │  RemoteOperationFailed  │ │
//! │  │  InvalidUrl     │  │  Core           │  │  NotImplemented         │ │
//! │  │  ConfigLoad/Save│  │  ProductNotFound│  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                               │
//! │  │    Database     │  │      Lock       │                               │
//! │  │  Database       │  │  Lock           │                               │
//! │  └─────────────────┘  └─────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups that find nothing, or find a row the caller may not read, are not
//! errors; see `catalog_db::Lookup`.

use catalog_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from the write path, the import and the remote clients.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// A configured base URL does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Write Path Errors
    // =========================================================================
    /// Required field, length or uniqueness violation.
    ///
    /// Raised before any remote call is made.
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// Domain invariant violation (remote id changed or empty).
    #[error("{0}")]
    Core(CoreError),

    /// No visible product with this local id.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// A call to the remote catalog failed; nothing was persisted locally.
    #[error("Remote {operation} failed: {message}")]
    RemoteOperationFailed { operation: String, message: String },

    /// The operation is disabled and is never attempted.
    #[error("{0}")]
    NotImplemented(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// Local database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Lock service failure.
    #[error("Lock error: {0}")]
    Lock(String),
}

impl SyncError {
    /// Wraps a remote client failure for `operation` (`list`, `push`, `delete`).
    pub fn remote(operation: &str, err: impl std::fmt::Display) -> Self {
        SyncError::RemoteOperationFailed {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true for validation failures (required, length, duplicate).
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }

    /// Returns true if the remote catalog call failed.
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::RemoteOperationFailed { .. })
    }

    /// Returns true for the disabled export.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, SyncError::NotImplemented(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Validation(err)
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(validation) => SyncError::Validation(validation),
            other => SyncError::Core(other),
        }
    }
}

impl From<catalog_db::DbError> for SyncError {
    fn from(err: catalog_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for SyncError {
    fn from(err: redis::RedisError) -> Self {
        SyncError::Lock(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_validation_unwraps_to_validation() {
        let err: SyncError = CoreError::Validation(ValidationError::Required {
            field: "name".into(),
        })
        .into();
        assert!(err.is_validation());

        let err: SyncError = CoreError::EmptyRemoteId {
            name: "Widget".into(),
        }
        .into();
        assert!(matches!(err, SyncError::Core(_)));
    }

    #[test]
    fn test_remote_error_display() {
        let err = SyncError::remote("push", "503 Service Unavailable");
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Remote push failed: 503 Service Unavailable");
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidConfig("bad".into()).is_config_error());
        assert!(SyncError::InvalidUrl("bad".into()).is_config_error());
        assert!(!SyncError::ProductNotFound(1).is_config_error());
    }
}
