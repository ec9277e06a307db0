//! Error types for sprout-dx
//!
//! Every handler returns [`ApiResult`]. Pipeline errors map onto HTTP
//! statuses here and nowhere else:
//!
//! | Error                                   | Status |
//! |-----------------------------------------|--------|
//! | invalid upload / parameters             | 400    |
//! | unknown backend id                      | 404    |
//! | inference failure (single backend)      | 502    |
//! | backend unavailable, all backends down  | 503    |
//! | anything unexpected                     | 500    |

use crate::pipeline::arbitrator::ArbitrationError;
use crate::pipeline::PipelineError;
use crate::types::ClassifierError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream model failed to produce a result (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Model backend unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

const BACKEND_HINT: &str =
    "Check that the classifier backend is running and reachable, then retry.";

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Classifier(e @ ClassifierError::BackendUnavailable { .. }) => {
                ApiError::ServiceUnavailable(format!("{}. {}", e, BACKEND_HINT))
            }
            PipelineError::Classifier(e @ ClassifierError::InferenceFailure { .. }) => {
                ApiError::BadGateway(e.to_string())
            }
            PipelineError::Arbitration(e @ ArbitrationError::AllBackendsUnavailable { .. }) => {
                ApiError::ServiceUnavailable(format!("{}. {}", e, BACKEND_HINT))
            }
            PipelineError::Arbitration(e @ ArbitrationError::NoBackends) => {
                ApiError::Internal(e.to_string())
            }
            PipelineError::UnknownBackend(id) => {
                ApiError::NotFound(format!("classifier backend '{}'", id))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            // Details stay in the log; clients get a generic message
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Other(err) => {
                error!(error = %err, "Unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
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
