//! # In-Memory Catalog
//!
//! A remote catalog held in process memory. Serves `backend = "memory"` for
//! local development and is the remote double in tests: it counts calls and
//! can be told to fail pushes, deletes or listings.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::RemoteCatalog;
use crate::error::{SyncError, SyncResult};
use catalog_core::{CatalogFields, RemotePage, RemoteProduct};

/// Ordered in-process product catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: Mutex<Vec<RemoteProduct>>,
    next_id: AtomicU64,
    push_delay: Duration,
    delete_delay: Duration,
    hide_page_count: bool,

    list_calls: AtomicUsize,
    push_calls: AtomicUsize,
    delete_calls: AtomicUsize,

    fail_lists: AtomicBool,
    fail_pushes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog already holding `products`, in order.
    pub fn with_products(products: Vec<RemoteProduct>) -> Self {
        InMemoryCatalog {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// Makes every push wait `delay` before answering.
    pub fn with_push_delay(mut self, delay: Duration) -> Self {
        self.push_delay = delay;
        self
    }

    /// Makes every delete wait `delay` before answering.
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    /// Answers listings without a page count, like a backend that only pages
    /// by size. Callers must then detect the end from the page contents.
    pub fn without_page_count(mut self) -> Self {
        self.hide_page_count = true;
        self
    }

    fn store(&self) -> MutexGuard<'_, Vec<RemoteProduct>> {
        self.products.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the stored products.
    pub fn products(&self) -> Vec<RemoteProduct> {
        self.store().clone()
    }

    /// Returns the product with this remote id.
    pub fn get(&self, remote_id: &str) -> Option<RemoteProduct> {
        self.store().iter().find(|p| p.id == remote_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn push_calls(&self) -> usize {
        self.push_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn snapshot(id: String, fields: &dyn CatalogFields) -> RemoteProduct {
        RemoteProduct {
            id,
            organization_id: fields.organization().map(str::to_owned),
            name: fields.name().to_string(),
            description: fields.description().map(str::to_owned),
            account_id: fields.account().map(str::to_owned),
            product_number: fields.product_number().map(str::to_owned),
            suppliers_product_number: fields.suppliers_product_number().map(str::to_owned),
            sales_tax_ruleset_id: fields.sales_tax_ruleset().map(str::to_owned),
            is_archived: fields.is_archived(),
        }
    }
}

#[async_trait]
impl RemoteCatalog for InMemoryCatalog {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, page: u32, page_size: u32) -> SyncResult<RemotePage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(SyncError::remote("list", "in-memory catalog set to fail"));
        }
        if page == 0 || page_size == 0 {
            return Err(SyncError::remote("list", "page and page_size must be positive"));
        }

        let store = self.store();
        let size = page_size as usize;
        let start = (page as usize - 1).saturating_mul(size);
        let products = store.iter().skip(start).take(size).cloned().collect();
        let total_pages = if self.hide_page_count {
            None
        } else {
            Some(store.len().div_ceil(size) as u32)
        };

        Ok(RemotePage {
            products,
            total_pages,
        })
    }

    async fn push(&self, product: &dyn CatalogFields) -> SyncResult<String> {
        self.push_calls.fetch_add(1, Ordering::SeqCst);

        if !self.push_delay.is_zero() {
            tokio::time::sleep(self.push_delay).await;
        }

        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(SyncError::remote("push", "in-memory catalog set to fail"));
        }

        let mut store = self.store();
        match product.remote_id() {
            Some(id) => {
                let slot = store
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| SyncError::remote("push", format!("unknown product id {}", id)))?;
                *slot = Self::snapshot(id.to_string(), product);
                debug!(remote_id = id, "Updated in-memory product");
                Ok(id.to_string())
            }
            None => {
                let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                store.push(Self::snapshot(id.clone(), product));
                debug!(remote_id = %id, "Created in-memory product");
                Ok(id)
            }
        }
    }

    async fn delete(&self, remote_id: &str) -> SyncResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(SyncError::remote("delete", "in-memory catalog set to fail"));
        }

        let mut store = self.store();
        let before = store.len();
        store.retain(|p| p.id != remote_id);
        if store.len() == before {
            return Err(SyncError::remote(
                "delete",
                format!("unknown product id {}", remote_id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::ProductInput;

    fn remote(n: usize) -> RemoteProduct {
        RemoteProduct {
            id: format!("r-{}", n),
            name: format!("Product {}", n),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_pages() {
        let catalog = InMemoryCatalog::with_products((1..=15).map(remote).collect());

        let first = catalog.list(1, 10).await.unwrap();
        assert_eq!(first.products.len(), 10);
        assert_eq!(first.total_pages, Some(2));
        assert_eq!(first.products[0].id, "r-1");

        let second = catalog.list(2, 10).await.unwrap();
        assert_eq!(second.products.len(), 5);
        assert_eq!(second.products[4].id, "r-15");

        let beyond = catalog.list(3, 10).await.unwrap();
        assert!(beyond.products.is_empty());
        assert_eq!(catalog.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_list_without_page_count() {
        let catalog =
            InMemoryCatalog::with_products((1..=15).map(remote).collect()).without_page_count();

        let first = catalog.list(1, 10).await.unwrap();
        assert_eq!(first.products.len(), 10);
        assert_eq!(first.total_pages, None);
        assert!(!first.is_last(1, 10));

        let second = catalog.list(2, 10).await.unwrap();
        assert_eq!(second.total_pages, None);
        assert!(second.is_last(2, 10));
    }

    #[tokio::test]
    async fn test_push_creates_then_updates() {
        let catalog = InMemoryCatalog::new();
        let mut input = ProductInput::named("Widget");

        let id = catalog.push(&input).await.unwrap();
        assert_eq!(catalog.len(), 1);

        input.remote_id = Some(id.clone());
        input.description = Some("Updated".into());
        let same = catalog.push(&input).await.unwrap();

        assert_eq!(same, id);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&id).unwrap().description.as_deref(), Some("Updated"));
        assert_eq!(catalog.push_calls(), 2);
    }

    #[tokio::test]
    async fn test_push_unknown_id_fails() {
        let catalog = InMemoryCatalog::new();
        let mut input = ProductInput::named("Widget");
        input.remote_id = Some("missing".into());
        assert!(catalog.push(&input).await.unwrap_err().is_remote());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let catalog = InMemoryCatalog::with_products(vec![remote(1)]);

        catalog.fail_pushes(true);
        assert!(catalog.push(&ProductInput::named("X")).await.is_err());

        catalog.fail_deletes(true);
        assert!(catalog.delete("r-1").await.is_err());
        assert_eq!(catalog.len(), 1);

        catalog.fail_deletes(false);
        catalog.delete("r-1").await.unwrap();
        assert!(catalog.is_empty());

        catalog.fail_lists(true);
        assert!(catalog.list(1, 10).await.is_err());
    }
}
