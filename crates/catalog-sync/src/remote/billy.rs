//! # Billy Catalog Client
//!
//! Billy REST v2 product endpoints.
//!
//! ```text
//! GET    /products?page=N&pageSize=P   → { meta.paging.pageCount, products: [...] }
//! POST   /products                     ← { product: {...} }  → { products: [{ id }] }
//! PUT    /products/{id}                ← { product: {...} }  → { products: [{ id }] }
//! DELETE /products/{id}
//!
//! Header: X-Access-Token: <token>
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{endpoint, ensure_success, RemoteCatalog};
use crate::error::{SyncError, SyncResult};
use catalog_core::{CatalogFields, RemotePage, RemoteProduct};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct BillyProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    organization_id: Option<String>,
    name: String,
    description: Option<String>,
    account_id: Option<String>,
    product_no: Option<String>,
    suppliers_product_no: Option<String>,
    sales_tax_ruleset_id: Option<String>,
    #[serde(default)]
    is_archived: bool,
}

impl BillyProduct {
    fn from_fields(fields: &dyn CatalogFields) -> Self {
        BillyProduct {
            id: None,
            organization_id: fields.organization().map(str::to_owned),
            name: fields.name().to_string(),
            description: fields.description().map(str::to_owned),
            account_id: fields.account().map(str::to_owned),
            product_no: fields.product_number().map(str::to_owned),
            suppliers_product_no: fields.suppliers_product_number().map(str::to_owned),
            sales_tax_ruleset_id: fields.sales_tax_ruleset().map(str::to_owned),
            is_archived: fields.is_archived(),
        }
    }

    /// A missing id becomes an empty one. The item stays on its page so page
    /// sizes are preserved, and the import rejects it.
    fn into_remote(self) -> RemoteProduct {
        if self.id.is_none() {
            warn!(name = %self.name, "Billy product without id");
        }
        RemoteProduct {
            id: self.id.unwrap_or_default(),
            organization_id: self.organization_id,
            name: self.name,
            description: self.description,
            account_id: self.account_id,
            product_number: self.product_no,
            suppliers_product_number: self.suppliers_product_no,
            sales_tax_ruleset_id: self.sales_tax_ruleset_id,
            is_archived: self.is_archived,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProductEnvelope {
    product: BillyProduct,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    page_count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    products: Vec<BillyProduct>,
}

impl ProductsResponse {
    fn into_page(self) -> RemotePage {
        let total_pages = self
            .meta
            .and_then(|meta| meta.paging)
            .and_then(|paging| paging.page_count);

        let products = self
            .products
            .into_iter()
            .map(BillyProduct::into_remote)
            .collect();

        RemotePage {
            products,
            total_pages,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Billy accounting API client.
#[derive(Debug, Clone)]
pub struct BillyCatalog {
    base_url: Url,
    http: Client,
    access_token: String,
}

impl BillyCatalog {
    pub fn new(base_url: &str, access_token: String, timeout: Duration) -> SyncResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let http = Client::builder()
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(BillyCatalog {
            base_url,
            http,
            access_token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("X-Access-Token", &self.access_token)
    }
}

#[async_trait]
impl RemoteCatalog for BillyCatalog {
    fn name(&self) -> &str {
        "billy"
    }

    async fn list(&self, page: u32, page_size: u32) -> SyncResult<RemotePage> {
        debug!(page, page_size, "Listing Billy products");

        let url = endpoint(&self.base_url, &["products"])?;
        let request = self
            .http
            .get(url)
            .query(&[("page", page), ("pageSize", page_size)]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::remote("list", e))?;
        let response = ensure_success("list", response).await?;

        let body: ProductsResponse = response
            .json()
            .await
            .map_err(|e| SyncError::remote("list", e))?;

        Ok(body.into_page())
    }

    async fn push(&self, product: &dyn CatalogFields) -> SyncResult<String> {
        let request = match product.remote_id() {
            Some(id) => self.http.put(endpoint(&self.base_url, &["products", id])?),
            None => self.http.post(endpoint(&self.base_url, &["products"])?),
        };

        debug!(name = product.name(), remote_id = ?product.remote_id(), "Pushing product to Billy");

        let envelope = ProductEnvelope {
            product: BillyProduct::from_fields(product),
        };

        let response = self
            .authorized(request)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| SyncError::remote("push", e))?;
        let response = ensure_success("push", response).await?;

        let body: ProductsResponse = response
            .json()
            .await
            .map_err(|e| SyncError::remote("push", e))?;

        body.products
            .into_iter()
            .next()
            .and_then(|saved| saved.id)
            .ok_or_else(|| SyncError::remote("push", "response contained no product id"))
    }

    async fn delete(&self, remote_id: &str) -> SyncResult<()> {
        debug!(remote_id, "Deleting product at Billy");

        let url = endpoint(&self.base_url, &["products", remote_id])?;
        let response = self
            .authorized(self.http.delete(url))
            .send()
            .await
            .map_err(|e| SyncError::remote("delete", e))?;
        ensure_success("delete", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ProductInput;

    #[test]
    fn test_push_body_uses_billy_field_names() {
        let mut input = ProductInput::named("Widget");
        input.number = Some("W-1".into());
        input.remote_account_id = Some("acc".into());
        input.is_archived = true;

        let body = serde_json::to_value(ProductEnvelope {
            product: BillyProduct::from_fields(&input),
        })
        .unwrap();

        let product = &body["product"];
        assert_eq!(product["name"], "Widget");
        assert_eq!(product["productNo"], "W-1");
        assert_eq!(product["accountId"], "acc");
        assert_eq!(product["isArchived"], true);
        assert!(product.get("id").is_none());
    }

    #[test]
    fn test_list_response_into_page() {
        let body: ProductsResponse = serde_json::from_str(
            r#"{
                "meta": { "paging": { "page": 1, "pageCount": 3, "pageSize": 2, "total": 5 } },
                "products": [
                    { "id": "p1", "name": "Widget", "organizationId": "org", "salesTaxRulesetId": "tax" },
                    { "name": "No id" },
                    { "id": "p2", "name": "Gadget", "isArchived": true }
                ]
            }"#,
        )
        .unwrap();

        let page = body.into_page();
        assert_eq!(page.total_pages, Some(3));
        assert_eq!(page.products.len(), 3);
        assert_eq!(page.products[0].id, "p1");
        assert_eq!(page.products[0].organization_id.as_deref(), Some("org"));
        assert_eq!(page.products[0].sales_tax_ruleset_id.as_deref(), Some("tax"));
        assert_eq!(page.products[1].id, "");
        assert_eq!(page.products[1].name, "No id");
        assert!(page.products[2].is_archived);
    }

    #[test]
    fn test_full_page_with_missing_id_is_not_last() {
        let body: ProductsResponse = serde_json::from_str(
            r#"{
                "products": [
                    { "id": "p1", "name": "Widget" },
                    { "name": "No id" }
                ]
            }"#,
        )
        .unwrap();

        let page = body.into_page();
        assert_eq!(page.total_pages, None);
        assert_eq!(page.products.len(), 2);
        assert!(!page.is_last(1, 2));
    }

    #[test]
    fn test_list_response_without_meta() {
        let body: ProductsResponse = serde_json::from_str(r#"{ "products": [] }"#).unwrap();
        let page = body.into_page();
        assert!(page.products.is_empty());
        assert_eq!(page.total_pages, None);
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let err = BillyCatalog::new("not a url", "t".into(), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(_)));
    }
}
