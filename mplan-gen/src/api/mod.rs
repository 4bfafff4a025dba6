//! HTTP API handlers for mplan-gen

pub mod generate;
pub mod health;
pub mod jobs;
pub mod sse;

pub use generate::generate_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use sse::event_stream;

use axum::http::HeaderMap;

use crate::error::ApiError;

/// Actor identity from the X-Actor header
///
/// Ownership and the concurrency guard key off this identity; requests
/// without it are rejected before any work starts.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing X-Actor header".to_string()))
}
