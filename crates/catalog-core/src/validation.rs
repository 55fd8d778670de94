//! # Validation Module
//!
//! Field rules checked before a write takes its lock.
//!
//! ## Where Each Rule Lives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (no I/O)                                          │
//! │  ├── name required, at most 200 characters                              │
//! │  └── import page size within 1..=1000                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: ProductWriter (inside the per-name lock)                      │
//! │  └── name unique among local products                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── NOT NULL name                                                      │
//! │  └── UNIQUE remote_id                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_IMPORT_PAGE_SIZE, MAX_PRODUCT_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty or whitespace only
/// - At most 200 characters (counted as characters, not bytes)
///
/// ## Example
/// ```rust
/// use catalog_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Widget").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates the page size used to page through a remote catalog.
pub fn validate_page_size(page_size: u32) -> ValidationResult<()> {
    if page_size == 0 || page_size > MAX_IMPORT_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "page_size".to_string(),
            min: 1,
            max: i64::from(MAX_IMPORT_PAGE_SIZE),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Widget").is_ok());
        assert!(validate_product_name(&"a".repeat(200)).is_ok());

        assert_eq!(
            validate_product_name(""),
            Err(ValidationError::Required {
                field: "name".to_string()
            })
        );
        assert!(matches!(
            validate_product_name(&"a".repeat(201)),
            Err(ValidationError::TooLong { max: 200, .. })
        ));
    }

    #[test]
    fn test_name_length_counts_characters() {
        // 200 two-byte characters are 400 bytes but still a valid name
        assert!(validate_product_name(&"ø".repeat(200)).is_ok());
        assert!(validate_product_name(&"ø".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_page_size() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(10).is_ok());
        assert!(validate_page_size(1000).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(1001).is_err());
    }
}
