//! Error types for fivewhy-api
//!
//! Every handler error renders as `{"error": {"code", "message"}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fivewhy_ml::{ArtifactError, InferenceError};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. duplicate equipment id
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Prediction failure (503 when no model is loaded, else 500)
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Model artifact could not be loaded
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// fivewhy-common error
    #[error(transparent)]
    Common(#[from] fivewhy_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Inference(ref err) => match err {
                InferenceError::ModelNotLoaded => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "MODEL_NOT_LOADED",
                    "Model not loaded".to_string(),
                ),
                InferenceError::InvalidThreshold(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_THRESHOLD", err.to_string())
                }
                InferenceError::Encoding { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ENCODING_ERROR",
                    err.to_string(),
                ),
            },
            ApiError::Artifact(ref err) => match err {
                ArtifactError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                    (StatusCode::NOT_FOUND, "MODEL_NOT_FOUND", err.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ARTIFACT_ERROR", err.to_string()),
            },
            ApiError::Common(err) => match err {
                fivewhy_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                fivewhy_common::Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                fivewhy_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
                }
                fivewhy_common::Error::Database(e) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    e.to_string(),
                ),
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    other.to_string(),
                ),
            },
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Common(fivewhy_common::Error::Conflict("dup".into())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Common(fivewhy_common::Error::InvalidInput("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Inference(InferenceError::ModelNotLoaded),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Inference(InferenceError::InvalidThreshold(f64::NAN)),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
