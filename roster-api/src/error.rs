//! Error types for roster-api
//!
//! Client-correctable failures carry structured, actionable messages.
//! Storage and unexpected failures are logged with detail and reported to
//! the caller with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use roster_common::CapacityRejection;
use serde_json::{json, Value};
use thiserror::Error;

use crate::assets::{DecodeError, MaterializeError};
use crate::roster::InvalidRow;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Subscription missing, expired, or allowance exhausted (403)
    #[error("{0}")]
    Capacity(#[from] CapacityRejection),

    /// No rows supplied (400)
    #[error("No students to import: {0}")]
    EmptyInput(String),

    /// One or more records failed validation; nothing was written (400)
    #[error("{message}")]
    Validation {
        message: String,
        invalid: Vec<InvalidRow>,
    },

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Inline image payload could not be decoded (400)
    #[error("Invalid image: {0}")]
    Decode(#[from] DecodeError),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found, including records owned by another school (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. email already registered
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Roster store or other roster-common failure
    #[error("Storage error: {0}")]
    Storage(#[from] roster_common::Error),
}

impl ApiError {
    /// Validation failure listing every invalid record
    pub fn validation(invalid: Vec<InvalidRow>) -> Self {
        let names: Vec<&str> = invalid.iter().map(|row| row.name.as_str()).collect();
        ApiError::Validation {
            message: format!(
                "{} record(s) are missing required fields: {}",
                invalid.len(),
                names.join(", ")
            ),
            invalid,
        }
    }
}

impl From<MaterializeError> for ApiError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::Decode(e) => ApiError::Decode(e),
            MaterializeError::Io(e) => ApiError::Io(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details): (StatusCode, &str, String, Option<Value>) =
            match self {
                ApiError::Capacity(ref rejection) => {
                    let code = match rejection {
                        CapacityRejection::NoSubscription => "NO_SUBSCRIPTION",
                        CapacityRejection::SubscriptionExpired { .. } => "SUBSCRIPTION_EXPIRED",
                        CapacityRejection::LimitExceeded { .. } => "CAPACITY_EXCEEDED",
                    };
                    (
                        StatusCode::FORBIDDEN,
                        code,
                        rejection.to_string(),
                        serde_json::to_value(rejection).ok(),
                    )
                }
                ApiError::EmptyInput(msg) => (StatusCode::BAD_REQUEST, "EMPTY_INPUT", msg, None),
                ApiError::Validation { message, invalid } => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    message,
                    Some(json!({ "invalidRows": invalid })),
                ),
                ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
                ApiError::Decode(err) => {
                    (StatusCode::BAD_REQUEST, "INVALID_IMAGE", err.to_string(), None)
                }
                ApiError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None)
                }
                ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
                ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
                ApiError::Internal(_) | ApiError::Io(_) | ApiError::Storage(_) => {
                    tracing::error!(error = %self, "Request failed with internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error".to_string(),
                        None,
                    )
                }
            };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
