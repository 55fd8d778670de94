//! # Admin Routes
//!
//! ```text
//! GET    /health                            liveness + migration status
//! GET    /admin/products?limit&offset       list visible products
//! POST   /admin/products                    create (write path)
//! PUT    /admin/products/{id}               update (write path)
//! DELETE /admin/products/{id}               delete remote, then local
//! GET    /admin/products/import-from-erp    pull the remote catalog
//! POST   /admin/products/export-to-erp      always 501
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::AppState;
use catalog_core::{Product, ProductInput};
use catalog_sync::{ImportReport, WriteRequest};

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

/// Builds the admin router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/products", get(list_products).post(create_product))
        .route(
            "/admin/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/admin/products/import-from-erp", get(import_from_erp))
        .route("/admin/products/export-to-erp", post(export_to_erp))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let database = state.db.health_check().await;
    let (migrations_total, migrations_applied) = state.db.migration_status().await?;

    Ok(Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
        migrations_total,
        migrations_applied,
    }))
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub items: Vec<Product>,
    pub total: i64,
}

async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductList>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let repo = state.db.products();
    let items = repo.list(limit, offset).await?;
    let total = repo.count().await?;

    Ok(Json(ProductList { items, total }))
}

async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.writer.write(WriteRequest::create(input)).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, ApiError> {
    let product = state.writer.write(WriteRequest::update(id, input)).await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.writer.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Import / Export
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: ImportReport,
}

async fn import_from_erp(State(state): State<AppState>) -> Result<Json<ImportResponse>, ApiError> {
    let report = state.reconciler.import_from_remote().await?;
    info!(created = report.created, "Import requested through admin API");

    Ok(Json(ImportResponse {
        message: report.message(),
        report,
    }))
}

async fn export_to_erp(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.reconciler.export_to_remote().await?;
    Ok(StatusCode::NO_CONTENT)
}
