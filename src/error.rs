//! Monitor error types with HTTP status code mapping.
//!
//! [`MonitorError`] is the central error type for the worker and its
//! status API. Each variant maps to a numeric error code and an HTTP
//! status so API handlers can return it directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ValidationError;
use crate::notify::NotifyError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "record not found: checks/abc",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Worker-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                  |
/// |-----------|---------------------|------------------------------|
/// | 1000–1999 | Validation / config | 400 Bad Request              |
/// | 2000–2999 | Record state        | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Storage / archive   | 500 Internal Server Error    |
/// | 4000–4999 | Downstream services | 502 Bad Gateway              |
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// No record with the given id exists in the collection.
    #[error("record not found: {collection}/{id}")]
    RecordNotFound {
        /// Collection name.
        collection: String,
        /// Record id.
        id: String,
    },

    /// A record with the given id already exists in the collection.
    #[error("record already exists: {collection}/{id}")]
    RecordExists {
        /// Collection name.
        collection: String,
        /// Record id.
        id: String,
    },

    /// Request or identifier validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A persisted check record is malformed.
    #[error("invalid check: {0}")]
    InvalidCheck(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Log archive failure (compression, decoding, truncation).
    #[error("archive error: {0}")]
    Archive(String),

    /// Alert delivery failure.
    #[error("notification error: {0}")]
    Notification(#[from] NotifyError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Shorthand for [`MonitorError::RecordNotFound`].
    #[must_use]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCheck(_) => 1002,
            Self::Config(_) => 1003,
            Self::RecordNotFound { .. } => 2001,
            Self::RecordExists { .. } => 2002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Io(_) => 3002,
            Self::Serialization(_) => 3003,
            Self::Archive(_) => 3004,
            Self::Notification(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCheck(_) | Self::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            Self::RecordExists { .. } => StatusCode::CONFLICT,
            Self::Internal(_)
            | Self::PersistenceError(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Notification(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
