//! Error types for hackrev-api
//!
//! Every failure leaves the service as `{ "error": { "code", "message" } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hackrev_ledger::LedgerError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request outside the ledger's own validation (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Ledger error, mapped by variant
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Ledger(LedgerError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            }
            ApiError::Ledger(LedgerError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Review {} not found", id),
            ),
            ApiError::Ledger(err @ LedgerError::Commit(_)) => {
                error!("Commit failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMIT_FAILURE",
                    err.to_string(),
                )
            }
            ApiError::Ledger(err @ LedgerError::Persistence(_)) => {
                error!("Persistence failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    err.to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
