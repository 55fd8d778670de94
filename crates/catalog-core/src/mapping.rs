//! # Remote Field Mapping
//!
//! The static table that turns a remote snapshot into local product fields.
//!
//! ## Mapping Table
//! ```text
//! ┌──────────────────────────┬───────────────────────────────┐
//! │ remote accessor          │ local field                   │
//! ├──────────────────────────┼───────────────────────────────┤
//! │ id                       │ remote_id                     │
//! │ organization             │ remote_organization_id        │
//! │ name                     │ name                          │
//! │ description              │ description                   │
//! │ account                  │ remote_account_id             │
//! │ productNo                │ number                        │
//! │ suppliersProductNo       │ suppliers_number              │
//! │ salesTaxRuleset          │ remote_sales_tax_ruleset_id   │
//! │ isArchived               │ is_archived                   │
//! └──────────────────────────┴───────────────────────────────┘
//! ```
//!
//! The copy is a loop over [`REMOTE_FIELD_MAP`]. Adding a field means adding
//! a row here, not touching the reconciler.

use crate::types::{CatalogFields, ProductInput};

// =============================================================================
// Field Values
// =============================================================================

/// A value read through one accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(Option<String>),
    Flag(bool),
}

// =============================================================================
// Local Fields
// =============================================================================

/// Writable local product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    RemoteId,
    Name,
    Description,
    Number,
    SuppliersNumber,
    RemoteOrganizationId,
    RemoteAccountId,
    RemoteSalesTaxRulesetId,
    IsArchived,
}

impl ProductField {
    /// Column name in the `products` table.
    pub fn column(self) -> &'static str {
        match self {
            ProductField::RemoteId => "remote_id",
            ProductField::Name => "name",
            ProductField::Description => "description",
            ProductField::Number => "number",
            ProductField::SuppliersNumber => "suppliers_number",
            ProductField::RemoteOrganizationId => "remote_organization_id",
            ProductField::RemoteAccountId => "remote_account_id",
            ProductField::RemoteSalesTaxRulesetId => "remote_sales_tax_ruleset_id",
            ProductField::IsArchived => "is_archived",
        }
    }

    fn text_slot(self, input: &mut ProductInput) -> Option<&mut Option<String>> {
        match self {
            ProductField::RemoteId => Some(&mut input.remote_id),
            ProductField::Description => Some(&mut input.description),
            ProductField::Number => Some(&mut input.number),
            ProductField::SuppliersNumber => Some(&mut input.suppliers_number),
            ProductField::RemoteOrganizationId => Some(&mut input.remote_organization_id),
            ProductField::RemoteAccountId => Some(&mut input.remote_account_id),
            ProductField::RemoteSalesTaxRulesetId => Some(&mut input.remote_sales_tax_ruleset_id),
            ProductField::Name | ProductField::IsArchived => None,
        }
    }

    /// Stores `value` into this field of `input`.
    ///
    /// A value of the wrong kind for the field is ignored.
    pub fn apply(self, input: &mut ProductInput, value: FieldValue) {
        match (self, value) {
            (ProductField::IsArchived, FieldValue::Flag(flag)) => input.is_archived = flag,
            (ProductField::Name, FieldValue::Text(text)) => input.name = text.unwrap_or_default(),
            (field, FieldValue::Text(text)) => {
                if let Some(slot) = field.text_slot(input) {
                    *slot = text;
                }
            }
            (_, FieldValue::Flag(_)) => {}
        }
    }
}

// =============================================================================
// Mapping Table
// =============================================================================

/// One row of the remote → local mapping.
#[derive(Clone, Copy)]
pub struct FieldMapping {
    /// Accessor name on the remote side.
    pub accessor: &'static str,

    /// Reads the value through the accessor contract.
    pub read: fn(&dyn CatalogFields) -> FieldValue,

    /// Local field the value lands in.
    pub field: ProductField,
}

impl std::fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMapping")
            .field("accessor", &self.accessor)
            .field("field", &self.field)
            .finish()
    }
}

fn text(value: Option<&str>) -> FieldValue {
    FieldValue::Text(value.map(str::to_owned))
}

fn read_id(p: &dyn CatalogFields) -> FieldValue {
    text(p.remote_id())
}
fn read_organization(p: &dyn CatalogFields) -> FieldValue {
    text(p.organization())
}
fn read_name(p: &dyn CatalogFields) -> FieldValue {
    text(Some(p.name()))
}
fn read_description(p: &dyn CatalogFields) -> FieldValue {
    text(p.description())
}
fn read_account(p: &dyn CatalogFields) -> FieldValue {
    text(p.account())
}
fn read_product_no(p: &dyn CatalogFields) -> FieldValue {
    text(p.product_number())
}
fn read_suppliers_product_no(p: &dyn CatalogFields) -> FieldValue {
    text(p.suppliers_product_number())
}
fn read_sales_tax_ruleset(p: &dyn CatalogFields) -> FieldValue {
    text(p.sales_tax_ruleset())
}
fn read_is_archived(p: &dyn CatalogFields) -> FieldValue {
    FieldValue::Flag(p.is_archived())
}

/// Remote accessor → local field, in the order they are copied.
pub static REMOTE_FIELD_MAP: [FieldMapping; 9] = [
    FieldMapping {
        accessor: "id",
        read: read_id,
        field: ProductField::RemoteId,
    },
    FieldMapping {
        accessor: "organization",
        read: read_organization,
        field: ProductField::RemoteOrganizationId,
    },
    FieldMapping {
        accessor: "name",
        read: read_name,
        field: ProductField::Name,
    },
    FieldMapping {
        accessor: "description",
        read: read_description,
        field: ProductField::Description,
    },
    FieldMapping {
        accessor: "account",
        read: read_account,
        field: ProductField::RemoteAccountId,
    },
    FieldMapping {
        accessor: "productNo",
        read: read_product_no,
        field: ProductField::Number,
    },
    FieldMapping {
        accessor: "suppliersProductNo",
        read: read_suppliers_product_no,
        field: ProductField::SuppliersNumber,
    },
    FieldMapping {
        accessor: "salesTaxRuleset",
        read: read_sales_tax_ruleset,
        field: ProductField::RemoteSalesTaxRulesetId,
    },
    FieldMapping {
        accessor: "isArchived",
        read: read_is_archived,
        field: ProductField::IsArchived,
    },
];

impl ProductInput {
    /// Builds a local input from anything exposing the catalog accessors,
    /// copying every row of [`REMOTE_FIELD_MAP`].
    pub fn from_remote(source: &dyn CatalogFields) -> Self {
        let mut input = ProductInput::default();
        for mapping in REMOTE_FIELD_MAP.iter() {
            mapping.field.apply(&mut input, (mapping.read)(source));
        }
        input
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
