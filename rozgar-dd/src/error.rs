//! Error types for rozgar-dd
//!
//! `DataError` is the resolution pipeline taxonomy. Upstream failures are
//! recovered inside the source cascade; only `RegionNotFound` and
//! `NoRegionsAvailable` ever reach an HTTP caller.
//!
//! `ApiError` is the HTTP-facing error with its JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Resolution pipeline errors
#[derive(Debug, Error)]
pub enum DataError {
    /// Transport or HTTP failure on a candidate source
    #[error("Upstream unavailable ({source_name}): {message}")]
    UpstreamUnavailable {
        source_name: String,
        status: Option<u16>,
        message: String,
        /// Timeouts, connection failures, 429 and 5xx are worth retrying
        transient: bool,
    },

    /// Candidate responded with something that is not a record list
    #[error("Malformed upstream response ({source_name}): {message}")]
    MalformedUpstreamResponse { source_name: String, message: String },

    /// Region identifier not present in the region catalog
    #[error("Region not found: {0}")]
    RegionNotFound(String),

    /// Nearest-region lookup against an empty catalog
    #[error("No regions available in the region catalog")]
    NoRegionsAvailable,
}

impl DataError {
    /// Whether the cascade may retry the same candidate/period
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::UpstreamUnavailable { transient: true, .. })
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Region catalog is empty (404-equivalent, server misconfiguration)
    #[error("No regions available: {0}")]
    NoRegionsAvailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// rozgar-common error
    #[error("Common error: {0}")]
    Common(#[from] rozgar_common::Error),
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::RegionNotFound(id) => ApiError::NotFound(format!("Region not found: {}", id)),
            DataError::NoRegionsAvailable => {
                ApiError::NoRegionsAvailable("region catalog is empty".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NoRegionsAvailable(msg) => {
                tracing::error!("Region catalog is empty; check catalog configuration");
                (StatusCode::NOT_FOUND, "NO_REGIONS_AVAILABLE", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(rozgar_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(rozgar_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
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
