//! Portrait job API handlers
//!
//! POST /api/jobs/portraits (202), GET /api/jobs/portraits/:id,
//! POST /api/jobs/portraits/:id/select, DELETE /api/jobs/portraits/:id

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::actor_from_headers;
use crate::error::{ApiError, ApiResult};
use crate::models::{PortraitJob, PortraitRequest};
use crate::AppState;

/// POST /api/jobs/portraits response
#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: String,
}

/// Job snapshot returned by GET and select
#[derive(Debug, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub status: String,
    pub artist: String,
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<PortraitJob> for JobSnapshot {
    fn from(job: PortraitJob) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status.as_str().to_string(),
            artist: job.request.artist,
            artifacts: job.artifacts,
            selected: job.selected,
            error: job.error,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// POST /api/jobs/portraits
///
/// Accepts a four-candidate portrait batch and returns immediately with
/// 202 Accepted; the batch runs in a background worker. The actor's
/// generation slot stays claimed until the batch finishes.
pub async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PortraitRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let actor = actor_from_headers(&headers)?;

    if request.artist.trim().is_empty() {
        return Err(ApiError::BadRequest("artist must not be empty".to_string()));
    }

    let lease = state.guard.try_acquire(&actor).ok_or_else(|| {
        ApiError::Conflict("A generation is already in progress for this actor".to_string())
    })?;

    let job_id = state.portrait_jobs.create(&actor, request, lease).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            job_id,
            status: "pending".to_string(),
        }),
    ))
}

/// GET /api/jobs/portraits/:id
///
/// Non-blocking snapshot. Jobs owned by other actors read as not found.
pub async fn get_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobSnapshot>> {
    let actor = actor_from_headers(&headers)?;

    let job = state
        .portrait_jobs
        .get(job_id, &actor)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Portrait job {} not found", job_id)))?;

    Ok(Json(JobSnapshot::from(job)))
}

/// POST /api/jobs/portraits/:id/select request
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub artifact: String,
}

/// POST /api/jobs/portraits/:id/select
///
/// Picks one produced candidate as the performer's portrait. Only
/// completed jobs accept a selection, and only among their own artifacts.
pub async fn select_artifact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<Uuid>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<JobSnapshot>> {
    let actor = actor_from_headers(&headers)?;

    let job = state
        .portrait_jobs
        .select(job_id, &actor, &request.artifact)
        .await?;

    Ok(Json(JobSnapshot::from(job)))
}

/// DELETE /api/jobs/portraits/:id response
#[derive(Debug, Serialize)]
pub struct DeleteJobResponse {
    pub deleted: bool,
}

/// DELETE /api/jobs/portraits/:id
///
/// Removes the job row and reclaims its artifact files. Idempotent with
/// respect to already-missing files; a missing job reads as not found.
pub async fn delete_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<DeleteJobResponse>> {
    let actor = actor_from_headers(&headers)?;

    let deleted = state.portrait_jobs.delete(job_id, &actor).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!(
            "Portrait job {} not found",
            job_id
        )));
    }

    Ok(Json(DeleteJobResponse { deleted }))
}

/// Build portrait job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs/portraits", post(create_job))
        .route(
            "/api/jobs/portraits/:job_id",
            get(get_job).delete(delete_job),
        )
        .route("/api/jobs/portraits/:job_id/select", post(select_artifact))
}
