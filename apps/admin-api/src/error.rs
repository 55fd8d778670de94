//! Error responses for the admin API.
//!
//! Every failure leaves the server as `{"code": "...", "message": "..."}`
//! with a matching HTTP status. Clients match on `code`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog_db::DbError;
use catalog_sync::SyncError;
use tracing::error;

/// Stable error codes.
pub mod error_code {
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const REMOTE_FAILED: &str = "REMOTE_FAILED";
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// An error on its way to the HTTP client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Validation(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, error_code::VALIDATION_FAILED, err.to_string())
            }
            SyncError::ProductNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, error_code::NOT_FOUND, err.to_string())
            }
            // A remote id that changed or came back empty is the remote's fault too
            SyncError::RemoteOperationFailed { .. } | SyncError::Core(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, error_code::REMOTE_FAILED, err.to_string())
            }
            SyncError::NotImplemented(_) => {
                ApiError::new(StatusCode::NOT_IMPLEMENTED, error_code::NOT_IMPLEMENTED, err.to_string())
            }
            other => {
                error!(error = %other, "Request failed");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_code::INTERNAL,
                    "Internal server error",
                )
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_not_found() {
            return ApiError::new(StatusCode::NOT_FOUND, error_code::NOT_FOUND, err.to_string());
        }
        SyncError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
