//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookups by local id, name and remote id, filtered by the read policy
//! - Paged listing for the admin endpoints
//! - A write transaction used by the product write path
//!
//! ## Write Transaction Lifetime
//! ```text
//! begin() ──► insert | update | delete ──► commit()
//!    │                                        │
//!    └──── dropped before commit: rolled back ◄┘
//! ```
//!
//! A write transaction opens with its write statement, so it takes the SQLite
//! write lock immediately and never holds a read snapshot that would have to
//! be upgraded later. Checks that decide whether to write are pool reads made
//! before `begin()`; callers serialise them per product name.

use std::sync::Arc;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::policy::ReadPolicy;
use crate::repository::Lookup;
use catalog_core::{Product, ProductInput};

macro_rules! select_products {
    ($tail:literal) => {
        concat!(
            "SELECT id, remote_id, name, description, number, suppliers_number, \
             remote_organization_id, remote_account_id, remote_sales_tax_ruleset_id, \
             is_archived, created_at, updated_at FROM products ",
            $tail
        )
    };
}

async fn fetch_by_id<'c, E>(executor: E, id: i64) -> DbResult<Option<Product>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, Product>(select_products!("WHERE id = ?1"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

async fn fetch_by_text<'c, E>(executor: E, sql: &'static str, value: &str) -> DbResult<Option<Product>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, Product>(sql)
        .bind(value)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

// =============================================================================
// Repository
// =============================================================================

/// Read access to products.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// if repo.find_by_remote_id("r-42").await?.is_found() {
///     // already imported
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    policy: Arc<dyn ReadPolicy>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, policy: Arc<dyn ReadPolicy>) -> Self {
        ProductRepository { pool, policy }
    }

    /// Gets a product by its local id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Lookup<Product>> {
        let row = fetch_by_id(&self.pool, id).await?;
        Ok(Lookup::classify(row, self.policy.as_ref()))
    }

    /// Gets the product with exactly this name.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Lookup<Product>> {
        let row = fetch_by_text(
            &self.pool,
            select_products!("WHERE name = ?1 ORDER BY id LIMIT 1"),
            name,
        )
        .await?;
        Ok(Lookup::classify(row, self.policy.as_ref()))
    }

    /// Gets the product linked to this remote id.
    pub async fn find_by_remote_id(&self, remote_id: &str) -> DbResult<Lookup<Product>> {
        let row = fetch_by_text(
            &self.pool,
            select_products!("WHERE remote_id = ?1"),
            remote_id,
        )
        .await?;
        Ok(Lookup::classify(row, self.policy.as_ref()))
    }

    /// Lists visible products ordered by local id.
    ///
    /// Rows the read policy hides are dropped from the page, so a page can be
    /// shorter than `limit` without being the last one.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(select_products!(
            "ORDER BY id LIMIT ?1 OFFSET ?2"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|product| self.policy.can_read(product))
            .collect())
    }

    /// Counts all stored products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Opens a write transaction.
    pub async fn begin(&self) -> DbResult<ProductTransaction> {
        let tx = self.pool.begin().await?;
        Ok(ProductTransaction { tx })
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// An open write transaction over the products table.
///
/// Nothing is visible to other connections until [`commit`](Self::commit).
/// Dropping the value without committing rolls everything back.
pub struct ProductTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl ProductTransaction {
    /// Inserts a new product and returns the stored row.
    pub async fn insert(&mut self, input: &ProductInput) -> DbResult<Product> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                remote_id, name, description, number, suppliers_number,
                remote_organization_id, remote_account_id, remote_sales_tax_ruleset_id,
                is_archived, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(input.remote_id.as_deref())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.number.as_deref())
        .bind(input.suppliers_number.as_deref())
        .bind(input.remote_organization_id.as_deref())
        .bind(input.remote_account_id.as_deref())
        .bind(input.remote_sales_tax_ruleset_id.as_deref())
        .bind(input.is_archived)
        .bind(now)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        let id = result.last_insert_rowid();
        debug!(product_id = id, name = %input.name, "Inserted product");

        fetch_by_id(&mut *self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Replaces the fields of product `id` with `input`.
    ///
    /// A stored remote id is never overwritten; a missing one is filled from
    /// `input`.
    pub async fn update(&mut self, id: i64, input: &ProductInput) -> DbResult<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                remote_id = COALESCE(remote_id, ?1),
                name = ?2,
                description = ?3,
                number = ?4,
                suppliers_number = ?5,
                remote_organization_id = ?6,
                remote_account_id = ?7,
                remote_sales_tax_ruleset_id = ?8,
                is_archived = ?9,
                updated_at = ?10
            WHERE id = ?11
            "#,
        )
        .bind(input.remote_id.as_deref())
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.number.as_deref())
        .bind(input.suppliers_number.as_deref())
        .bind(input.remote_organization_id.as_deref())
        .bind(input.remote_account_id.as_deref())
        .bind(input.remote_sales_tax_ruleset_id.as_deref())
        .bind(input.is_archived)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = id, name = %input.name, "Updated product");

        fetch_by_id(&mut *self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes product `id`.
    pub async fn delete(&mut self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = id, "Deleted product");
        Ok(())
    }

    /// Commits every statement of this transaction.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Rolls back explicitly. Equivalent to dropping the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
