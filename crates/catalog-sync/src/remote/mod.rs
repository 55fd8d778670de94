//! # Remote Catalog Clients
//!
//! The capability set the sync engine consumes from an external catalog.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     RemoteCatalog (trait)                               │
//! │                                                                         │
//! │   list(page, page_size)  → RemotePage        (import, read only)        │
//! │   push(&dyn CatalogFields) → remote id       (create or update)         │
//! │   delete(remote_id)      → ()                                           │
//! │                                                                         │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐            │
//! │   │ BillyCatalog │   │  ErpCatalog  │   │ InMemoryCatalog  │            │
//! │   │ REST v2      │   │ generic REST │   │ dev + tests      │            │
//! │   └──────────────┘   └──────────────┘   └──────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `push` creates when the fields carry no remote id and updates otherwise.
//! Every transport, status or decoding failure is reported as
//! [`SyncError::RemoteOperationFailed`].

pub mod billy;
pub mod erp;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{CatalogFields, RemotePage};
use tracing::info;

use crate::config::{RemoteBackend, SyncConfig};
use crate::error::{SyncError, SyncResult};

pub use billy::BillyCatalog;
pub use erp::ErpCatalog;
pub use memory::InMemoryCatalog;

/// An external product catalog.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Short backend name for logs and messages.
    fn name(&self) -> &str;

    /// Fetches one page (1-based) of the remote catalog.
    async fn list(&self, page: u32, page_size: u32) -> SyncResult<RemotePage>;

    /// Creates or updates a product and returns its remote id.
    async fn push(&self, product: &dyn CatalogFields) -> SyncResult<String>;

    /// Deletes the product with this remote id.
    async fn delete(&self, remote_id: &str) -> SyncResult<()>;
}

/// Builds the remote catalog selected by `config.remote.backend`.
pub fn from_config(config: &SyncConfig) -> SyncResult<Arc<dyn RemoteCatalog>> {
    let timeout = Duration::from_secs(config.http.timeout_secs);

    let remote: Arc<dyn RemoteCatalog> = match config.remote.backend {
        RemoteBackend::Billy => {
            let token = config.billy.access_token.clone().ok_or_else(|| {
                SyncError::InvalidConfig("billy.access_token is not set".into())
            })?;
            Arc::new(BillyCatalog::new(&config.billy.base_url, token, timeout)?)
        }
        RemoteBackend::Erp => {
            let base_url = config
                .erp
                .base_url
                .as_deref()
                .ok_or_else(|| SyncError::InvalidConfig("erp.base_url is not set".into()))?;
            Arc::new(ErpCatalog::new(base_url, config.erp.api_key.clone(), timeout)?)
        }
        RemoteBackend::Memory => Arc::new(InMemoryCatalog::new()),
    };

    info!(backend = remote.name(), "Remote catalog configured");
    Ok(remote)
}

/// Passes successful responses through; turns any other status into
/// [`SyncError::RemoteOperationFailed`] carrying the start of the body.
pub(crate) async fn ensure_success(
    operation: &str,
    response: reqwest::Response,
) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > 512 {
        let mut cut = 512;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    Err(SyncError::remote(operation, format!("HTTP {}: {}", status, body)))
}

/// Joins `segments` onto a base URL, keeping the base path.
pub(crate) fn endpoint(base: &url::Url, segments: &[&str]) -> SyncResult<url::Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let base = url::Url::parse("https://api.billysbilling.com/v2/").unwrap();
        let url = endpoint(&base, &["products", "abc"]).unwrap();
        assert_eq!(url.as_str(), "https://api.billysbilling.com/v2/products/abc");

        let base = url::Url::parse("https://erp.example.com/api").unwrap();
        let url = endpoint(&base, &["products"]).unwrap();
        assert_eq!(url.as_str(), "https://erp.example.com/api/products");
    }

    #[test]
    fn test_from_config_selects_backend() {
        let config = SyncConfig::default();
        assert_eq!(from_config(&config).unwrap().name(), "memory");

        let mut config = SyncConfig::default();
        config.remote.backend = RemoteBackend::Erp;
        config.erp.base_url = Some("https://erp.example.com/api".into());
        assert_eq!(from_config(&config).unwrap().name(), "erp");

        config.remote.backend = RemoteBackend::Billy;
        assert!(from_config(&config).is_err());
        config.billy.access_token = Some("token".into());
        assert_eq!(from_config(&config).unwrap().name(), "billy");
    }
}
