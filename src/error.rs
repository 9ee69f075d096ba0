//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    gateway::GatewayError,
    services::transfer_service::{PostingError, TransferRejection},
};

/// Application-wide error type.
///
/// Every failure is scoped to the request that triggered it. Each variant
/// maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Storage Errors**: query or connection failures (details are hidden)
/// - **Authentication Errors**: invalid or missing API keys
/// - **Resource Errors**: requested rows not found for this owner
/// - **Business Rule Errors**: rejected transfers, category conflicts, settlement rules
/// - **Validation Errors**: invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or its owner is inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The row does not exist or belongs to another owner.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Input failed a business validation (empty name, non-positive amount, ...).
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Request body or parameters are malformed.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Transfer validation failed; nothing was written.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error(transparent)]
    TransferRejected(#[from] TransferRejection),

    /// A transfer write failed after earlier writes were applied.
    ///
    /// Returns HTTP 500 with a message naming the failed step.
    #[error(transparent)]
    TransferPartiallyApplied(#[from] PostingError),

    /// Category still referenced by transactions.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Category is used by {count} transaction(s) and cannot be deleted")]
    CategoryInUse { count: usize },

    /// Another category of the owner already has this name.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("A category named \"{0}\" already exists")]
    DuplicateCategory(String),

    /// Settled transactions cannot go back to pending or be settled twice.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Transaction is already settled")]
    AlreadySettled,
}

impl From<GatewayError> for AppError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Database(e) => AppError::Database(e),
            GatewayError::NotFound { entity, .. } => AppError::NotFound(entity),
            GatewayError::Rejected(reason) => AppError::Validation(reason),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Validation` / `InvalidRequest` → 400 Bad Request
/// - `InvalidApiKey` → 401 Unauthorized
/// - `NotFound` → 404 Not Found
/// - `CategoryInUse` / `DuplicateCategory` / `AlreadySettled` → 409 Conflict
/// - `TransferRejected` → 422 Unprocessable Entity
/// - `TransferPartiallyApplied` / `Database` → 500 Internal Server Error
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_failed", msg.clone())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::TransferRejected(ref rejection) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                rejection.code(),
                rejection.to_string(),
            ),
            AppError::TransferPartiallyApplied(ref failure) => {
                tracing::error!(
                    failed_step = %failure.failed_step,
                    completed = failure.completed_steps.len(),
                    "Transfer partially applied: {}",
                    failure.source
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "transfer_partially_applied",
                    failure.to_string(),
                )
            }
            AppError::CategoryInUse { .. } => {
                (StatusCode::CONFLICT, "category_in_use", self.to_string())
            }
            AppError::DuplicateCategory(_) => {
                (StatusCode::CONFLICT, "duplicate_category", self.to_string())
            }
            AppError::AlreadySettled => (StatusCode::CONFLICT, "already_settled", self.to_string()),
            AppError::Database(ref e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
