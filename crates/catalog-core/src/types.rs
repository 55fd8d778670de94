//! # Domain Types
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  ProductInput   │   │ RemoteProduct   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (local)     │   │  what a write   │   │  snapshot from  │       │
//! │  │  remote_id      │   │  asks for       │   │  Billy / ERP    │       │
//! │  │  name (unique)  │   │                 │   │  (never stored) │       │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘       │
//! │           │                     │                     │                 │
//! │           └─────────────────────┼─────────────────────┘                 │
//! │                                 ▼                                       │
//! │                      CatalogFields (accessors)                          │
//! │            the one shape both push and import read through              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! - `id`: local integer key, assigned by the database on create
//! - `remote_id`: the remote system's key, assigned after the first
//!   successful push and never changed afterwards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::validation::{self, ValidationResult};

// =============================================================================
// Accessor Contract
// =============================================================================

/// Read access to the catalog field set.
///
/// Remote clients build their request bodies from these accessors, and the
/// import mapping reads remote snapshots through them, so the remote shape
/// is adapted in exactly one place per backend.
pub trait CatalogFields: Send + Sync {
    fn remote_id(&self) -> Option<&str>;
    fn organization(&self) -> Option<&str>;
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn account(&self) -> Option<&str>;
    fn product_number(&self) -> Option<&str>;
    fn suppliers_product_number(&self) -> Option<&str>;
    fn sales_tax_ruleset(&self) -> Option<&str>;
    fn is_archived(&self) -> bool;
}

// =============================================================================
// Remote Linkage Defaults
// =============================================================================

/// Values used for remote-linkage fields a write leaves unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefaults {
    /// Remote organization the product is filed under.
    pub organization_id: String,

    /// Remote revenue account.
    pub account_id: String,

    /// Remote sales tax ruleset.
    pub sales_tax_ruleset_id: String,
}

impl Default for LinkDefaults {
    fn default() -> Self {
        LinkDefaults {
            organization_id: "cwNMzNn1TOWhrYwyb6jdfA".to_string(),
            account_id: "4qAjMzZRRoO7sOAjzkorjw".to_string(),
            sales_tax_ruleset_id: "K5A89XDhQJeiyC9HtTX6Hw".to_string(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A persisted product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Local identifier.
    pub id: i64,

    /// Identifier at the remote catalog.
    pub remote_id: Option<String>,

    /// Display name, unique among local products.
    pub name: String,

    pub description: Option<String>,

    /// Own product number.
    pub number: Option<String>,

    /// Supplier's product number.
    pub suppliers_number: Option<String>,

    pub remote_organization_id: Option<String>,
    pub remote_account_id: Option<String>,
    pub remote_sales_tax_ruleset_id: Option<String>,

    pub is_archived: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the writable field set of this product.
    ///
    /// Used as the starting point of an update so fields the caller does not
    /// touch keep their stored values.
    pub fn to_input(&self) -> ProductInput {
        ProductInput {
            remote_id: self.remote_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            number: self.number.clone(),
            suppliers_number: self.suppliers_number.clone(),
            remote_organization_id: self.remote_organization_id.clone(),
            remote_account_id: self.remote_account_id.clone(),
            remote_sales_tax_ruleset_id: self.remote_sales_tax_ruleset_id.clone(),
            is_archived: self.is_archived,
        }
    }
}

impl CatalogFields for Product {
    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }
    fn organization(&self) -> Option<&str> {
        self.remote_organization_id.as_deref()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn account(&self) -> Option<&str> {
        self.remote_account_id.as_deref()
    }
    fn product_number(&self) -> Option<&str> {
        self.number.as_deref()
    }
    fn suppliers_product_number(&self) -> Option<&str> {
        self.suppliers_number.as_deref()
    }
    fn sales_tax_ruleset(&self) -> Option<&str> {
        self.remote_sales_tax_ruleset_id.as_deref()
    }
    fn is_archived(&self) -> bool {
        self.is_archived
    }
}

// =============================================================================
// Product Input
// =============================================================================

/// The field set a write asks for.
///
/// `remote_id` is never taken from an admin request body; it is either
/// carried over from the stored row, copied from a remote snapshot during
/// import, or assigned from the answer to a push.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(skip_deserializing)]
    pub remote_id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub number: Option<String>,

    #[serde(default)]
    pub suppliers_number: Option<String>,

    #[serde(default)]
    pub remote_organization_id: Option<String>,

    #[serde(default)]
    pub remote_account_id: Option<String>,

    #[serde(default)]
    pub remote_sales_tax_ruleset_id: Option<String>,

    #[serde(default)]
    pub is_archived: bool,
}

impl ProductInput {
    /// Creates an input with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        ProductInput {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Checks the field rules (required name, maximum length).
    ///
    /// Uniqueness is not checked here: it needs the database and the
    /// per-name lock.
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_product_name(&self.name)
    }

    /// Fills unset (missing or blank) remote-linkage fields from `defaults`.
    pub fn apply_defaults(&mut self, defaults: &LinkDefaults) {
        fill_blank(&mut self.remote_organization_id, &defaults.organization_id);
        fill_blank(&mut self.remote_account_id, &defaults.account_id);
        fill_blank(
            &mut self.remote_sales_tax_ruleset_id,
            &defaults.sales_tax_ruleset_id,
        );
    }

    /// Records the identifier returned by the remote system.
    ///
    /// ## Rules
    /// - An empty id is rejected
    /// - No remote id yet: the id is taken
    /// - Same remote id: no-op
    /// - Different remote id: [`CoreError::RemoteIdChanged`]
    pub fn assign_remote_id(&mut self, id: impl Into<String>) -> CoreResult<()> {
        let id = id.into();

        if id.trim().is_empty() {
            return Err(CoreError::EmptyRemoteId {
                name: self.name.clone(),
            });
        }

        match &self.remote_id {
            Some(current) if *current != id => Err(CoreError::RemoteIdChanged {
                name: self.name.clone(),
                current: current.clone(),
                proposed: id,
            }),
            Some(_) => Ok(()),
            None => {
                self.remote_id = Some(id);
                Ok(())
            }
        }
    }
}

fn fill_blank(field: &mut Option<String>, default: &str) {
    let blank = field.as_deref().map_or(true, |v| v.trim().is_empty());
    if blank {
        *field = Some(default.to_string());
    }
}

impl CatalogFields for ProductInput {
    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }
    fn organization(&self) -> Option<&str> {
        self.remote_organization_id.as_deref()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn account(&self) -> Option<&str> {
        self.remote_account_id.as_deref()
    }
    fn product_number(&self) -> Option<&str> {
        self.number.as_deref()
    }
    fn suppliers_product_number(&self) -> Option<&str> {
        self.suppliers_number.as_deref()
    }
    fn sales_tax_ruleset(&self) -> Option<&str> {
        self.remote_sales_tax_ruleset_id.as_deref()
    }
    fn is_archived(&self) -> bool {
        self.is_archived
    }
}

// =============================================================================
// Remote Product Snapshot
// =============================================================================

/// A product as the remote catalog reports it.
///
/// Transient: translated into a [`ProductInput`] through
/// [`crate::mapping::REMOTE_FIELD_MAP`], never stored as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: String,
    pub organization_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub account_id: Option<String>,
    pub product_number: Option<String>,
    pub suppliers_product_number: Option<String>,
    pub sales_tax_ruleset_id: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

impl CatalogFields for RemoteProduct {
    fn remote_id(&self) -> Option<&str> {
        Some(&self.id)
    }
    fn organization(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn account(&self) -> Option<&str> {
        self.account_id.as_deref()
    }
    fn product_number(&self) -> Option<&str> {
        self.product_number.as_deref()
    }
    fn suppliers_product_number(&self) -> Option<&str> {
        self.suppliers_product_number.as_deref()
    }
    fn sales_tax_ruleset(&self) -> Option<&str> {
        self.sales_tax_ruleset_id.as_deref()
    }
    fn is_archived(&self) -> bool {
        self.is_archived
    }
}

// =============================================================================
// Remote Page
// =============================================================================

/// One page of a remote catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePage {
    /// Products on this page, in remote order.
    pub products: Vec<RemoteProduct>,

    /// Total number of pages, when the backend reports it.
    pub total_pages: Option<u32>,
}

impl RemotePage {
    /// Returns true if no page follows `page`.
    ///
    /// ```text
    /// total_pages known   →  page >= total_pages
    /// total_pages unknown →  fewer than page_size products on this page
    /// empty page          →  always last
    /// ```
    pub fn is_last(&self, page: u32, page_size: u32) -> bool {
        if self.products.is_empty() {
            return true;
        }
        match self.total_pages {
            Some(total) => page >= total,
            None => self.products.len() < page_size as usize,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str, name: &str) -> RemoteProduct {
        RemoteProduct {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_defaults_fills_only_blank_fields() {
        let defaults = LinkDefaults::default();
        let mut input = ProductInput::named("Widget");
        input.remote_account_id = Some("custom-account".to_string());
        input.remote_sales_tax_ruleset_id = Some("   ".to_string());

        input.apply_defaults(&defaults);

        assert_eq!(
            input.remote_organization_id.as_deref(),
            Some(defaults.organization_id.as_str())
        );
        assert_eq!(input.remote_account_id.as_deref(), Some("custom-account"));
        assert_eq!(
            input.remote_sales_tax_ruleset_id.as_deref(),
            Some(defaults.sales_tax_ruleset_id.as_str())
        );
    }

    #[test]
    fn test_assign_remote_id_once() {
        let mut input = ProductInput::named("Widget");
        input.assign_remote_id("r-1").unwrap();
        assert_eq!(input.remote_id.as_deref(), Some("r-1"));

        // Same id again is fine
        input.assign_remote_id("r-1").unwrap();

        // A different id is refused and the stored one survives
        let err = input.assign_remote_id("r-2").unwrap_err();
        assert!(matches!(err, CoreError::RemoteIdChanged { .. }));
        assert_eq!(input.remote_id.as_deref(), Some("r-1"));
    }

    #[test]
    fn test_assign_empty_remote_id_rejected() {
        let mut input = ProductInput::named("Widget");
        assert!(matches!(
            input.assign_remote_id(""),
            Err(CoreError::EmptyRemoteId { .. })
        ));
        assert!(input.remote_id.is_none());
    }

    #[test]
    fn test_input_deserialization_ignores_remote_id() {
        let input: ProductInput =
            serde_json::from_str(r#"{"name":"Widget","remote_id":"forged"}"#).unwrap();
        assert_eq!(input.name, "Widget");
        assert!(input.remote_id.is_none());
        assert!(!input.is_archived);
    }

    #[test]
    fn test_page_is_last_by_size() {
        let page = RemotePage {
            products: vec![remote("a", "A"), remote("b", "B")],
            total_pages: None,
        };
        assert!(page.is_last(1, 10));
        assert!(!page.is_last(1, 2));
    }

    #[test]
    fn test_page_is_last_by_total() {
        let page = RemotePage {
            products: vec![remote("a", "A"), remote("b", "B")],
            total_pages: Some(3),
        };
        assert!(!page.is_last(2, 2));
        assert!(page.is_last(3, 2));
    }

    #[test]
    fn test_empty_page_is_last() {
        let page = RemotePage {
            products: vec![],
            total_pages: Some(5),
        };
        assert!(page.is_last(1, 10));
    }
}
