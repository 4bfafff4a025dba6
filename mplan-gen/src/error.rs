//! Error types for mplan-gen

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::jobs::SelectError;
use crate::services::coordinator::GenerateError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., actor already has a generation in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Generator exceeded its wall-clock budget (504)
    #[error("Generation timed out: {0}")]
    Timeout(String),

    /// Generator could not be launched or exited with failure (502)
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<mplan_common::Error> for ApiError {
    fn from(err: mplan_common::Error) -> Self {
        match err {
            mplan_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            mplan_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::TimedOut(budget) => {
                ApiError::Timeout(format!("generation exceeded {} seconds", budget.as_secs()))
            }
            GenerateError::LaunchFailed(msg) => ApiError::Generation(msg),
            GenerateError::ExecutionFailed { exit_code, .. } => ApiError::Generation(format!(
                "generator exited with code {:?} and produced no artifact",
                exit_code
            )),
            GenerateError::Common(err) => err.into(),
        }
    }
}

impl From<SelectError> for ApiError {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::NotFound => ApiError::NotFound("Portrait job not found".to_string()),
            SelectError::NotCompleted => {
                ApiError::Conflict("Portrait job is not completed".to_string())
            }
            SelectError::InvalidArtifact(artifact) => ApiError::BadRequest(format!(
                "Artifact is not part of this job: {}",
                artifact
            )),
            SelectError::Db(e) => ApiError::Internal(e.to_string()),
            SelectError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "GENERATION_TIMEOUT", msg),
            ApiError::Generation(msg) => (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
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
