//! # ERP Catalog Client
//!
//! Generic ERP REST product endpoints.
//!
//! ```text
//! GET    /products?page=N&per_page=P   → { items: [...], total_pages? }
//! POST   /products                     ← {...}  → { id }
//! PUT    /products/{id}                ← {...}  → { id }
//! DELETE /products/{id}
//!
//! Header: Authorization: Bearer <api_key>   (when configured)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{endpoint, ensure_success, RemoteCatalog};
use crate::error::{SyncError, SyncResult};
use catalog_core::{CatalogFields, RemotePage, RemoteProduct};

#[derive(Debug, Serialize)]
struct ErpProductBody<'a> {
    name: &'a str,
    organization_id: Option<&'a str>,
    description: Option<&'a str>,
    account_id: Option<&'a str>,
    product_number: Option<&'a str>,
    suppliers_product_number: Option<&'a str>,
    sales_tax_ruleset_id: Option<&'a str>,
    is_archived: bool,
}

impl<'a> ErpProductBody<'a> {
    fn from_fields(fields: &'a dyn CatalogFields) -> Self {
        ErpProductBody {
            name: fields.name(),
            organization_id: fields.organization(),
            description: fields.description(),
            account_id: fields.account(),
            product_number: fields.product_number(),
            suppliers_product_number: fields.suppliers_product_number(),
            sales_tax_ruleset_id: fields.sales_tax_ruleset(),
            is_archived: fields.is_archived(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<RemoteProduct>,
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SavedResponse {
    id: String,
}

/// Generic ERP API client.
#[derive(Debug, Clone)]
pub struct ErpCatalog {
    base_url: Url,
    http: Client,
    api_key: Option<String>,
}

impl ErpCatalog {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> SyncResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        let http = Client::builder()
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(ErpCatalog {
            base_url,
            http,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteCatalog for ErpCatalog {
    fn name(&self) -> &str {
        "erp"
    }

    async fn list(&self, page: u32, page_size: u32) -> SyncResult<RemotePage> {
        debug!(page, page_size, "Listing ERP products");

        let url = endpoint(&self.base_url, &["products"])?;
        let request = self
            .http
            .get(url)
            .query(&[("page", page), ("per_page", page_size)]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::remote("list", e))?;
        let response = ensure_success("list", response).await?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| SyncError::remote("list", e))?;

        Ok(RemotePage {
            products: body.items,
            total_pages: body.total_pages,
        })
    }

    async fn push(&self, product: &dyn CatalogFields) -> SyncResult<String> {
        let request = match product.remote_id() {
            Some(id) => self.http.put(endpoint(&self.base_url, &["products", id])?),
            None => self.http.post(endpoint(&self.base_url, &["products"])?),
        };

        debug!(name = product.name(), remote_id = ?product.remote_id(), "Pushing product to ERP");

        let response = self
            .authorized(request)
            .json(&ErpProductBody::from_fields(product))
            .send()
            .await
            .map_err(|e| SyncError::remote("push", e))?;
        let response = ensure_success("push", response).await?;

        let saved: SavedResponse = response
            .json()
            .await
            .map_err(|e| SyncError::remote("push", e))?;

        Ok(saved.id)
    }

    async fn delete(&self, remote_id: &str) -> SyncResult<()> {
        debug!(remote_id, "Deleting product at ERP");

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
    fn test_push_body_fields() {
        let mut input = ProductInput::named("Widget");
        input.suppliers_number = Some("SUP-1".into());

        let body = serde_json::to_value(ErpProductBody::from_fields(&input)).unwrap();
        assert_eq!(body["name"], "Widget");
        assert_eq!(body["suppliers_product_number"], "SUP-1");
        assert_eq!(body["is_archived"], false);
        assert!(body["description"].is_null());
    }

    #[test]
    fn test_list_response_parsing() {
        let body: ListResponse = serde_json::from_str(
            r#"{ "items": [ { "id": "e1", "name": "Widget" } ], "total_pages": 4 }"#,
        )
        .unwrap();
        assert_eq!(body.items.len(), 1);
        assert_eq!(body.items[0].id, "e1");
        assert_eq!(body.total_pages, Some(4));

        let body: ListResponse = serde_json::from_str(r#"{ "items": [] }"#).unwrap();
        assert_eq!(body.total_pages, None);
    }

    #[test]
    fn test_blank_api_key_is_dropped() {
        let client =
            ErpCatalog::new("https://erp.example.com/api", Some("  ".into()), Duration::from_secs(1))
                .unwrap();
        assert!(client.api_key.is_none());
    }
}
