//! # Import Reconciler
//!
//! Pulls the remote catalog into the local store.
//!
//! ## Per-Record Decision
//! ```text
//!  remote page N ──► for each record
//!                     │
//!                     ├─ local product with this name?      ──► skip (by name)
//!                     ├─ local product with this remote id? ──► skip (already imported)
//!                     └─ otherwise map fields, write as import
//!                           ├─ ok                           ──► created
//!                           └─ validation failure           ──► rejected, continue
//!
//!  stop after the last page (reported page count, short page or empty page)
//! ```
//!
//! Import never deletes a local product and never writes to the remote
//! catalog. A remote failure aborts the run; running it again is safe because
//! every record already imported is skipped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteCatalog;
use crate::writer::{ProductWriter, WriteRequest};
use catalog_core::validation::validate_page_size;
use catalog_core::{ProductInput, RemoteProduct};
use catalog_db::{Database, Lookup};

/// Returned by every export attempt.
pub const EXPORT_DISABLED_MESSAGE: &str =
    "Pushing to ERP is not implemented as this will delete products at ERP";

/// Counters from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub pages_fetched: u32,
    pub created: u32,
    pub skipped_by_name: u32,
    pub skipped_by_remote_id: u32,
    pub rejected: u32,
}

impl ImportReport {
    /// Human-readable summary.
    pub fn message(&self) -> String {
        format!(
            "Imported {} new products ({} skipped by name, {} already imported, {} rejected, {} pages fetched)",
            self.created,
            self.skipped_by_name,
            self.skipped_by_remote_id,
            self.rejected,
            self.pages_fetched
        )
    }
}

/// Drives import and (disabled) export against one remote catalog.
#[derive(Clone)]
pub struct ImportReconciler {
    db: Database,
    remote: Arc<dyn RemoteCatalog>,
    writer: ProductWriter,
    page_size: u32,
}

impl ImportReconciler {
    /// `writer` must push to the same remote catalog as `remote`.
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteCatalog>,
        writer: ProductWriter,
        page_size: u32,
    ) -> SyncResult<Self> {
        validate_page_size(page_size)?;
        Ok(ImportReconciler {
            db,
            remote,
            writer,
            page_size,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Imports every remote product not yet known locally.
    pub async fn import_from_remote(&self) -> SyncResult<ImportReport> {
        info!(remote = self.remote.name(), page_size = self.page_size, "Import started");

        let mut report = ImportReport::default();
        let mut page = 1u32;

        loop {
            let batch = self.remote.list(page, self.page_size).await?;
            report.pages_fetched += 1;
            debug!(page, records = batch.products.len(), total_pages = ?batch.total_pages, "Fetched remote page");

            for record in &batch.products {
                self.reconcile(record, &mut report).await?;
            }

            if batch.is_last(page, self.page_size) {
                break;
            }
            page += 1;
        }

        info!(
            remote = self.remote.name(),
            pages = report.pages_fetched,
            created = report.created,
            skipped_by_name = report.skipped_by_name,
            skipped_by_remote_id = report.skipped_by_remote_id,
            rejected = report.rejected,
            "Import finished"
        );

        Ok(report)
    }

    async fn reconcile(&self, record: &RemoteProduct, report: &mut ImportReport) -> SyncResult<()> {
        let products = self.db.products();

        // A row hidden by the read policy counts as absent here
        if let Lookup::Found(local) = products.find_by_name(&record.name).await? {
            debug!(remote_id = %record.id, local_id = local.id, name = %record.name, "Skipping, name exists");
            report.skipped_by_name += 1;
            return Ok(());
        }

        if record.id.trim().is_empty() {
            warn!(name = %record.name, "Rejected remote product without id");
            report.rejected += 1;
            return Ok(());
        }

        if let Lookup::Found(local) = products.find_by_remote_id(&record.id).await? {
            debug!(remote_id = %record.id, local_id = local.id, "Skipping, already imported");
            report.skipped_by_remote_id += 1;
            return Ok(());
        }

        let input = ProductInput::from_remote(record);
        match self.writer.write(WriteRequest::import(input)).await {
            Ok(product) => {
                debug!(remote_id = %record.id, local_id = product.id, "Imported product");
                report.created += 1;
                Ok(())
            }
            Err(SyncError::Validation(e)) => {
                warn!(remote_id = %record.id, name = %record.name, error = %e, "Rejected remote product");
                report.rejected += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Full local → remote export.
    ///
    /// Always fails: making the remote catalog match the local one would
    /// delete remote products that predate this store.
    pub async fn export_to_remote(&self) -> SyncResult<()> {
        warn!(remote = self.remote.name(), "Export requested but disabled");
        Err(SyncError::NotImplemented(EXPORT_DISABLED_MESSAGE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LocalLockService;
    use crate::remote::InMemoryCatalog;
    use catalog_core::{LinkDefaults, Product};
    use catalog_db::{DbConfig, ReadPolicy};

    struct Harness {
        db: Database,
        remote: Arc<InMemoryCatalog>,
        reconciler: ImportReconciler,
    }

    async fn harness_with(db: Database, remote: InMemoryCatalog, page_size: u32) -> Harness {
        let remote = Arc::new(remote);
        let writer = ProductWriter::new(
            db.clone(),
            remote.clone(),
            Arc::new(LocalLockService::new()),
            LinkDefaults::default(),
        );
        let reconciler = ImportReconciler::new(db.clone(), remote.clone(), writer, page_size).unwrap();
        Harness {
            db,
            remote,
            reconciler,
        }
    }

    async fn harness(remote: InMemoryCatalog) -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        harness_with(db, remote, 10).await
    }

    fn remote_products(count: usize) -> Vec<RemoteProduct> {
        (1..=count)
            .map(|n| RemoteProduct {
                id: format!("r-{}", n),
                name: format!("Product {}", n),
                ..Default::default()
            })
            .collect()
    }

    async fn insert_local(db: &Database, input: ProductInput) -> Product {
        let mut tx = db.products().begin().await.unwrap();
        let product = tx.insert(&input).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_imports_all_pages() {
        let h = harness(InMemoryCatalog::with_products(remote_products(15))).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 15);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(h.remote.list_calls(), 2);
        assert_eq!(h.db.products().count().await.unwrap(), 15);

        let imported = h.db.products().find_by_remote_id("r-15").await.unwrap().found().unwrap();
        assert_eq!(imported.name, "Product 15");
        // Unset linkage fields are filled from the defaults
        assert_eq!(
            imported.remote_organization_id.as_deref(),
            Some(LinkDefaults::default().organization_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_import_is_a_pure_pull() {
        let h = harness(InMemoryCatalog::with_products(remote_products(3))).await;
        let before = h.remote.products();

        h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(h.remote.push_calls(), 0);
        assert_eq!(h.remote.delete_calls(), 0);
        assert_eq!(h.remote.products(), before);
    }

    #[tokio::test]
    async fn test_second_import_creates_nothing() {
        let h = harness(InMemoryCatalog::with_products(remote_products(12))).await;

        let first = h.reconciler.import_from_remote().await.unwrap();
        let second = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(first.created, 12);
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped_by_name, 12);
        assert_eq!(h.db.products().count().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let h = harness(InMemoryCatalog::with_products(remote_products(20))).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 20);
        assert_eq!(h.remote.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_short_page_ends_import_without_page_count() {
        let h = harness(InMemoryCatalog::with_products(remote_products(15)).without_page_count()).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 15);
        assert_eq!(report.pages_fetched, 2);
        assert_eq!(h.remote.list_calls(), 2);
        assert_eq!(h.db.products().count().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_full_last_page_needs_empty_fetch_without_page_count() {
        let h = harness(InMemoryCatalog::with_products(remote_products(20)).without_page_count()).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 20);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(h.remote.list_calls(), 3);
        assert_eq!(h.db.products().count().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_missing_id_on_full_page_does_not_end_import() {
        let mut products = remote_products(12);
        products[4].id = String::new();
        let h = harness(InMemoryCatalog::with_products(products).without_page_count()).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 11);
        assert_eq!(report.rejected, 1);
        assert_eq!(h.remote.list_calls(), 2);
        assert!(h.db.products().find_by_remote_id("r-12").await.unwrap().is_found());
    }

    #[tokio::test]
    async fn test_empty_remote_catalog() {
        let h = harness(InMemoryCatalog::new()).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report, ImportReport { pages_fetched: 1, ..Default::default() });
        assert_eq!(h.remote.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_name_match_is_skipped_without_changes() {
        let h = harness(InMemoryCatalog::with_products(vec![RemoteProduct {
            id: "r-9".into(),
            name: "Widget".into(),
            description: Some("Remote description".into()),
            ..Default::default()
        }]))
        .await;

        let mut local = ProductInput::named("Widget");
        local.remote_id = Some("r-1".into());
        local.description = Some("Local description".into());
        let before = insert_local(&h.db, local).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.skipped_by_name, 1);
        let after = h.db.products().get_by_id(before.id).await.unwrap().found().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_remote_id_match_is_skipped_without_update() {
        let h = harness(InMemoryCatalog::with_products(vec![RemoteProduct {
            id: "r-1".into(),
            name: "Renamed remotely".into(),
            ..Default::default()
        }]))
        .await;

        let mut local = ProductInput::named("Original name");
        local.remote_id = Some("r-1".into());
        let before = insert_local(&h.db, local).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.skipped_by_remote_id, 1);
        assert_eq!(report.created, 0);
        let after = h.db.products().get_by_id(before.id).await.unwrap().found().unwrap();
        assert_eq!(after.name, "Original name");
    }

    #[derive(Debug)]
    struct HideArchived;

    impl ReadPolicy for HideArchived {
        fn can_read(&self, product: &Product) -> bool {
            !product.is_archived
        }
    }

    #[tokio::test]
    async fn test_hidden_name_conflict_is_rejected_and_run_continues() {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_read_policy(Arc::new(HideArchived));
        let h = harness_with(
            db,
            InMemoryCatalog::with_products(vec![
                RemoteProduct {
                    id: "r-1".into(),
                    name: "Widget".into(),
                    ..Default::default()
                },
                RemoteProduct {
                    id: "r-2".into(),
                    name: "Gadget".into(),
                    ..Default::default()
                },
            ]),
            10,
        )
        .await;

        let mut archived = ProductInput::named("Widget");
        archived.is_archived = true;
        insert_local(&h.db, archived).await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.created, 1);
        assert!(h.db.products().find_by_remote_id("r-2").await.unwrap().is_found());
    }

    #[tokio::test]
    async fn test_invalid_remote_records_are_rejected() {
        let h = harness(InMemoryCatalog::with_products(vec![
            RemoteProduct {
                id: "r-1".into(),
                name: "   ".into(),
                ..Default::default()
            },
            RemoteProduct {
                id: "".into(),
                name: "No id".into(),
                ..Default::default()
            },
            RemoteProduct {
                id: "r-3".into(),
                name: "Fine".into(),
                ..Default::default()
            },
        ]))
        .await;

        let report = h.reconciler.import_from_remote().await.unwrap();

        assert_eq!(report.rejected, 2);
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_aborts_import() {
        let h = harness(InMemoryCatalog::with_products(remote_products(5))).await;
        h.remote.fail_lists(true);

        let err = h.reconciler.import_from_remote().await.unwrap_err();

        assert!(err.is_remote());
        assert_eq!(h.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_export_is_disabled() {
        let h = harness(InMemoryCatalog::with_products(remote_products(2))).await;
        insert_local(&h.db, ProductInput::named("Local only")).await;
        let before = h.remote.products();

        let err = h.reconciler.export_to_remote().await.unwrap_err();

        assert!(err.is_not_implemented());
        assert_eq!(err.to_string(), EXPORT_DISABLED_MESSAGE);
        assert_eq!(h.remote.products(), before);
        assert_eq!(h.remote.push_calls(), 0);
        assert_eq!(h.remote.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_page_size_is_validated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote: Arc<dyn RemoteCatalog> = Arc::new(InMemoryCatalog::new());
        let writer = ProductWriter::new(
            db.clone(),
            remote.clone(),
            Arc::new(LocalLockService::new()),
            LinkDefaults::default(),
        );

        let err = ImportReconciler::new(db, remote, writer, 0).err().unwrap();
        assert!(err.is_validation());
    }

    #[test]
    fn test_report_message() {
        let report = ImportReport {
            pages_fetched: 2,
            created: 15,
            skipped_by_name: 1,
            skipped_by_remote_id: 0,
            rejected: 0,
        };
        assert!(report.message().starts_with("Imported 15 new products"));
    }
}
