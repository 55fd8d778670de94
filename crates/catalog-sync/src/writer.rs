//! # Product Write Path
//!
//! The single entry point every product create, update and import goes
//! through, plus the delete path.
//!
//! ## Write Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write(request)                                                         │
//! │                                                                         │
//! │  0. field rules (name required, ≤ 200 chars)     ✗ → Validation         │
//! │  1. acquire lock  product:<sha256(name)>         (waits, no timeout)    │
//! │     load stored row (update)                     ✗ → ProductNotFound    │
//! │  2. fill unset organization/account/tax ruleset from defaults           │
//! │  3. name unique? (Found other / Denied)          ✗ → Validation         │
//! │  4. push to remote catalog                       ✗ → RemoteOperation-   │
//! │     (skipped for imports)                            Failed, no write   │
//! │  5. record the remote id on a new product                               │
//! │  6. begin, insert / update, commit                                      │
//! │  7. lock released when the guard leaves scope                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The push always happens before the commit, so a stored remote id is one
//! the remote catalog has confirmed. Steps 1 to 5 read through the pool and
//! hold no transaction; the transaction in step 6 starts with its write, so
//! a slow remote call never keeps a SQLite snapshot open and writers for
//! other names are never refused with `database is locked`.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{SyncError, SyncResult};
use crate::lock::{lock_key_for_name, LockService};
use crate::remote::RemoteCatalog;
use catalog_core::{LinkDefaults, Product, ProductInput, ValidationError};
use catalog_db::{Database, DbError, Lookup};

// =============================================================================
// Requests
// =============================================================================

/// Who asked for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// Admin endpoint. The remote id only ever comes from the stored row or
    /// from the push answer.
    Admin,

    /// Import reconciler. The remote id comes from the remote snapshot and
    /// nothing is pushed back.
    Import,
}

/// A create, an update of local id N, or an import.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub id: Option<i64>,
    pub input: ProductInput,
    pub origin: WriteOrigin,
}

impl WriteRequest {
    pub fn create(input: ProductInput) -> Self {
        WriteRequest {
            id: None,
            input,
            origin: WriteOrigin::Admin,
        }
    }

    pub fn update(id: i64, input: ProductInput) -> Self {
        WriteRequest {
            id: Some(id),
            input,
            origin: WriteOrigin::Admin,
        }
    }

    pub fn import(input: ProductInput) -> Self {
        WriteRequest {
            id: None,
            input,
            origin: WriteOrigin::Import,
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Product write and delete path.
#[derive(Clone)]
pub struct ProductWriter {
    db: Database,
    remote: Arc<dyn RemoteCatalog>,
    locks: Arc<dyn LockService>,
    defaults: LinkDefaults,
}

impl ProductWriter {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteCatalog>,
        locks: Arc<dyn LockService>,
        defaults: LinkDefaults,
    ) -> Self {
        ProductWriter {
            db,
            remote,
            locks,
            defaults,
        }
    }

    /// Creates, updates or imports a product. See the module docs for the
    /// sequence.
    pub async fn write(&self, request: WriteRequest) -> SyncResult<Product> {
        let WriteRequest {
            id,
            mut input,
            origin,
        } = request;

        if origin == WriteOrigin::Admin {
            input.remote_id = None;
        }

        input.validate()?;

        let _guard = self
            .locks
            .acquire_exclusive(&lock_key_for_name(&input.name))
            .await?;

        let repo = self.db.products();

        let existing = match id {
            Some(id) => match repo.get_by_id(id).await? {
                Lookup::Found(product) => Some(product),
                Lookup::Denied | Lookup::NotFound => return Err(SyncError::ProductNotFound(id)),
            },
            None => None,
        };

        if let Some(stored) = &existing {
            input.remote_id = stored.remote_id.clone();
        }

        input.apply_defaults(&self.defaults);

        // Uniqueness is only re-checked when the name is new to this row
        let name_changed = existing.as_ref().map_or(true, |stored| stored.name != input.name);
        if name_changed {
            match repo.find_by_name(&input.name).await? {
                Lookup::NotFound => {}
                Lookup::Found(_) | Lookup::Denied => {
                    debug!(name = %input.name, "Name already taken");
                    return Err(duplicate("name", &input.name));
                }
            }
        }

        if origin != WriteOrigin::Import {
            let remote_id = self.remote.push(&input).await?;
            input.assign_remote_id(remote_id)?;
        }

        let mut tx = repo.begin().await?;
        let stored = match &existing {
            Some(stored) => tx.update(stored.id, &input).await,
            None => tx.insert(&input).await,
        }
        .map_err(|e| match e {
            DbError::UniqueViolation { .. } => {
                duplicate("remote_id", input.remote_id.as_deref().unwrap_or_default())
            }
            DbError::NotFound { .. } => SyncError::ProductNotFound(id.unwrap_or_default()),
            other => other.into(),
        })?;

        tx.commit().await?;

        info!(
            product_id = stored.id,
            remote_id = ?stored.remote_id,
            name = %stored.name,
            ?origin,
            created = existing.is_none(),
            "Product written"
        );

        Ok(stored)
    }

    /// Deletes a product remotely, then locally.
    ///
    /// If the remote delete fails the local row is left untouched. A product
    /// that never reached the remote catalog is only deleted locally.
    pub async fn delete(&self, id: i64) -> SyncResult<()> {
        loop {
            let name = match self.db.products().get_by_id(id).await? {
                Lookup::Found(product) => product.name,
                Lookup::Denied | Lookup::NotFound => return Err(SyncError::ProductNotFound(id)),
            };

            let _guard = self.locks.acquire_exclusive(&lock_key_for_name(&name)).await?;

            let product = match self.db.products().get_by_id(id).await? {
                Lookup::Found(product) => product,
                Lookup::Denied | Lookup::NotFound => return Err(SyncError::ProductNotFound(id)),
            };

            if product.name != name {
                // Renamed while we waited; lock the current name instead
                debug!(product_id = id, "Product renamed during delete, retrying");
                continue;
            }

            if let Some(remote_id) = product.remote_id.as_deref() {
                self.remote.delete(remote_id).await?;
            }

            let mut tx = self.db.products().begin().await?;
            if let Err(e) = tx.delete(id).await {
                error!(
                    product_id = id,
                    remote_id = ?product.remote_id,
                    error = %e,
                    "Local delete failed after remote delete"
                );
                return Err(e.into());
            }
            tx.commit().await?;

            info!(product_id = id, remote_id = ?product.remote_id, "Product deleted");
            return Ok(());
        }
    }
}

fn duplicate(field: &str, value: &str) -> SyncError {
    SyncError::Validation(ValidationError::Duplicate {
        field: field.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LocalLockService;
    use crate::remote::InMemoryCatalog;
    use catalog_db::{DbConfig, ReadPolicy};
    use std::time::Duration;

    struct Harness {
        db: Database,
        remote: Arc<InMemoryCatalog>,
        writer: ProductWriter,
    }

    async fn harness_with(db: Database, remote: InMemoryCatalog) -> Harness {
        let remote = Arc::new(remote);
        let writer = ProductWriter::new(
            db.clone(),
            remote.clone(),
            Arc::new(LocalLockService::new()),
            LinkDefaults::default(),
        );
        Harness { db, remote, writer }
    }

    async fn harness() -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        harness_with(db, InMemoryCatalog::new()).await
    }

    async fn insert_local(db: &Database, input: ProductInput) -> Product {
        let mut tx = db.products().begin().await.unwrap();
        let product = tx.insert(&input).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    #[derive(Debug)]
    struct HideArchived;

    impl ReadPolicy for HideArchived {
        fn can_read(&self, product: &Product) -> bool {
            !product.is_archived
        }
    }

    #[tokio::test]
    async fn test_create_pushes_then_stores_remote_id() {
        let h = harness().await;

        let product = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        let remote_id = product.remote_id.clone().unwrap();
        let remote = h.remote.get(&remote_id).unwrap();
        assert_eq!(remote.name, "Widget");

        // Defaults are filled before the push, so both sides carry them
        let defaults = LinkDefaults::default();
        assert_eq!(product.remote_account_id.as_deref(), Some(defaults.account_id.as_str()));
        assert_eq!(remote.account_id.as_deref(), Some(defaults.account_id.as_str()));
        assert_eq!(h.remote.push_calls(), 1);
    }

    #[tokio::test]
    async fn test_admin_input_cannot_set_remote_id() {
        let h = harness().await;
        let mut input = ProductInput::named("Widget");
        input.remote_id = Some("forged".into());

        let product = h.writer.write(WriteRequest::create(input)).await.unwrap();
        assert_ne!(product.remote_id.as_deref(), Some("forged"));
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_remote_call() {
        let h = harness().await;

        let err = h
            .writer
            .write(WriteRequest::create(ProductInput::named("  ")))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(h.remote.push_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected_before_push() {
        let h = harness().await;
        h.writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        let err = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::Duplicate { ref field, .. }) if field == "name"
        ));
        assert_eq!(h.remote.push_calls(), 1);
        assert_eq!(h.db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hidden_row_still_blocks_name() {
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_read_policy(Arc::new(HideArchived));
        let h = harness_with(db, InMemoryCatalog::new()).await;

        let mut archived = ProductInput::named("Widget");
        archived.is_archived = true;
        insert_local(&h.db, archived).await;

        let err = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert_eq!(h.remote.push_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_push_on_create_stores_nothing() {
        let h = harness().await;
        h.remote.fail_pushes(true);

        let err = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert_eq!(h.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_push_on_update_leaves_row_unchanged() {
        let h = harness().await;
        let before = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        h.remote.fail_pushes(true);
        let mut changes = ProductInput::named("Widget Pro");
        changes.description = Some("Changed".into());
        let err = h
            .writer
            .write(WriteRequest::update(before.id, changes))
            .await
            .unwrap_err();
        assert!(err.is_remote());

        let after = h.db.products().get_by_id(before.id).await.unwrap().found().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_update_keeps_remote_id_and_updates_remote() {
        let h = harness().await;
        let created = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        let mut changes = ProductInput::named("Widget");
        changes.description = Some("Now with more widget".into());
        let updated = h
            .writer
            .write(WriteRequest::update(created.id, changes))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.remote_id, created.remote_id);
        assert_eq!(h.remote.len(), 1);
        let remote = h.remote.get(created.remote_id.as_deref().unwrap()).unwrap();
        assert_eq!(remote.description.as_deref(), Some("Now with more widget"));
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_is_rejected() {
        let h = harness().await;
        h.writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();
        let gadget = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Gadget")))
            .await
            .unwrap();

        let err = h
            .writer
            .write(WriteRequest::update(gadget.id, ProductInput::named("Widget")))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let h = harness().await;
        let err = h
            .writer
            .write(WriteRequest::update(404, ProductInput::named("Ghost")))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ProductNotFound(404)));
        assert_eq!(h.remote.push_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_same_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let h = harness_with(
            db,
            InMemoryCatalog::new().with_push_delay(Duration::from_millis(50)),
        )
        .await;

        let (first, second) = tokio::join!(
            h.writer.write(WriteRequest::create(ProductInput::named("Widget"))),
            h.writer.write(WriteRequest::create(ProductInput::named("Widget"))),
        );

        let results = [first, second];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_validation()))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(h.remote.push_calls(), 1);
        assert_eq!(h.remote.len(), 1);
        assert_eq!(h.db.products().count().await.unwrap(), 1);
    }

    async fn file_db(dir: &tempfile::TempDir) -> Database {
        Database::new(DbConfig::new(dir.path().join("catalog.db")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_different_names_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness_with(
            file_db(&dir).await,
            InMemoryCatalog::new().with_push_delay(Duration::from_millis(100)),
        )
        .await;

        // Beta starts while Alpha is still waiting on its push
        let (alpha, beta) = tokio::join!(
            h.writer.write(WriteRequest::create(ProductInput::named("Alpha"))),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                h.writer.write(WriteRequest::create(ProductInput::named("Beta"))).await
            },
        );

        let alpha = alpha.unwrap();
        let beta = beta.unwrap();
        assert_ne!(alpha.remote_id, beta.remote_id);
        assert_eq!(h.remote.push_calls(), 2);
        assert_eq!(h.remote.len(), 2);
        assert_eq!(h.db.products().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_create_overlap_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness_with(
            file_db(&dir).await,
            InMemoryCatalog::new().with_delete_delay(Duration::from_millis(100)),
        )
        .await;
        let old = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Old")))
            .await
            .unwrap();

        let (deleted, created) = tokio::join!(h.writer.delete(old.id), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.writer.write(WriteRequest::create(ProductInput::named("New"))).await
        });

        deleted.unwrap();
        let created = created.unwrap();
        assert!(h.db.products().get_by_id(old.id).await.unwrap().is_not_found());
        assert!(h.db.products().find_by_name("New").await.unwrap().is_found());
        assert_eq!(h.remote.len(), 1);
        assert!(h.remote.get(created.remote_id.as_deref().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_import_keeps_snapshot_id_without_push() {
        let h = harness().await;
        let mut input = ProductInput::named("Widget");
        input.remote_id = Some("r-42".into());

        let product = h.writer.write(WriteRequest::import(input)).await.unwrap();

        assert_eq!(product.remote_id.as_deref(), Some("r-42"));
        assert!(product.remote_organization_id.is_some());
        assert_eq!(h.remote.push_calls(), 0);
    }

    #[tokio::test]
    async fn test_import_with_taken_remote_id_is_a_validation_failure() {
        let h = harness().await;
        let mut first = ProductInput::named("Widget");
        first.remote_id = Some("r-42".into());
        h.writer.write(WriteRequest::import(first)).await.unwrap();

        let mut second = ProductInput::named("Gadget");
        second.remote_id = Some("r-42".into());
        let err = h.writer.write(WriteRequest::import(second)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_delete_removes_remote_then_local() {
        let h = harness().await;
        let product = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        h.writer.delete(product.id).await.unwrap();

        assert!(h.remote.is_empty());
        assert!(h.db.products().get_by_id(product.id).await.unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_remote_delete_keeps_local_row() {
        let h = harness().await;
        let product = h
            .writer
            .write(WriteRequest::create(ProductInput::named("Widget")))
            .await
            .unwrap();

        h.remote.fail_deletes(true);
        let err = h.writer.delete(product.id).await.unwrap_err();

        assert!(err.is_remote());
        let after = h.db.products().get_by_id(product.id).await.unwrap().found().unwrap();
        assert_eq!(after, product);
        assert_eq!(h.remote.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_local_only_product() {
        let h = harness().await;
        let product = insert_local(&h.db, ProductInput::named("Draft")).await;

        h.writer.delete(product.id).await.unwrap();

        assert_eq!(h.remote.delete_calls(), 0);
        assert_eq!(h.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_product() {
        let h = harness().await;
        assert!(matches!(
            h.writer.delete(7).await,
            Err(SyncError::ProductNotFound(7))
        ));
    }
}
