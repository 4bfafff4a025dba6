//! Portrait job persistence
//!
//! The job row is the single shared mutable resource between the creating
//! request and the background worker. Every status mutation is a single
//! status-predicated UPDATE, so an out-of-order or duplicate transition
//! matches zero rows instead of corrupting the state machine.

use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{JobStatus, PortraitJob, PortraitRequest};
use mplan_common::{Error, Result};

/// Outcome of the select operation, per the job API contract
#[derive(Debug, Error)]
pub enum SelectError {
    /// Job absent, or owned by a different actor; the two cases read the
    /// same so other actors' job ids stay unobservable
    #[error("Job not found")]
    NotFound,

    /// Job has not reached the completed state
    #[error("Job is not completed")]
    NotCompleted,

    /// The supplied reference is not a member of the job's artifact list
    #[error("Artifact is not part of this job: {0}")]
    InvalidArtifact(String),

    /// Underlying storage failure
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    /// Row encode/decode failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Insert a freshly created job row (status pending)
pub async fn insert_job(pool: &SqlitePool, job: &PortraitJob) -> Result<()> {
    let request = serde_json::to_string(&job.request)
        .map_err(|e| Error::Internal(format!("Failed to serialize request: {}", e)))?;
    let artifacts = serde_json::to_string(&job.artifacts)
        .map_err(|e| Error::Internal(format!("Failed to serialize artifacts: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO portrait_jobs (
            job_id, owner, status, request, artifacts,
            selected, error, created_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.job_id.to_string())
    .bind(&job.owner)
    .bind(job.status.as_str())
    .bind(&request)
    .bind(&artifacts)
    .bind(&job.selected)
    .bind(&job.error)
    .bind(job.created_at.to_rfc3339())
    .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a job owned by the given actor
///
/// A job owned by someone else reads as absent.
pub async fn load_job(pool: &SqlitePool, job_id: Uuid, owner: &str) -> Result<Option<PortraitJob>> {
    let row = sqlx::query(
        r#"
        SELECT job_id, owner, status, request, artifacts,
               selected, error, created_at, completed_at
        FROM portrait_jobs
        WHERE job_id = ? AND owner = ?
        "#,
    )
    .bind(job_id.to_string())
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    row.map(job_from_row).transpose()
}

/// Advance pending → generating; returns false if the job was not pending
/// (already claimed, deleted, or finalized)
pub async fn mark_generating(pool: &SqlitePool, job_id: Uuid) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE portrait_jobs
        SET status = 'generating'
        WHERE job_id = ? AND status = 'pending'
        "#,
    )
    .bind(job_id.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows > 0)
}

/// Append one produced artifact to the job's ordered list
///
/// Single read-modify-write inside a transaction; only applies while the
/// job is still generating.
pub async fn append_artifact(pool: &SqlitePool, job_id: Uuid, artifact: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    let artifacts: Option<String> = sqlx::query_scalar(
        r#"
        SELECT artifacts FROM portrait_jobs
        WHERE job_id = ? AND status = 'generating'
        "#,
    )
    .bind(job_id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(artifacts) = artifacts else {
        // Job deleted or finalized out from under the worker; nothing to
        // append to.
        tx.commit().await?;
        return Ok(());
    };

    let mut list: Vec<String> = serde_json::from_str(&artifacts)
        .map_err(|e| Error::Internal(format!("Failed to deserialize artifacts: {}", e)))?;
    list.push(artifact.to_string());
    let updated = serde_json::to_string(&list)
        .map_err(|e| Error::Internal(format!("Failed to serialize artifacts: {}", e)))?;

    sqlx::query("UPDATE portrait_jobs SET artifacts = ? WHERE job_id = ?")
        .bind(&updated)
        .bind(job_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Finalize generating → completed
pub async fn finalize_completed(pool: &SqlitePool, job_id: Uuid) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE portrait_jobs
        SET status = 'completed', completed_at = ?
        WHERE job_id = ? AND status = 'generating'
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(job_id.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows > 0)
}

/// Finalize generating → failed with a human-readable error
pub async fn finalize_failed(pool: &SqlitePool, job_id: Uuid, error: &str) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE portrait_jobs
        SET status = 'failed', error = ?, completed_at = ?
        WHERE job_id = ? AND status IN ('pending', 'generating')
        "#,
    )
    .bind(error)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(job_id.to_string())
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows > 0)
}

/// Select one of a completed job's artifacts and point the performer record
/// at it, in one transaction
///
/// Idempotent: reselecting overwrites the previous choice.
pub async fn select_artifact(
    pool: &SqlitePool,
    job_id: Uuid,
    owner: &str,
    artifact: &str,
) -> std::result::Result<PortraitJob, SelectError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT job_id, owner, status, request, artifacts,
               selected, error, created_at, completed_at
        FROM portrait_jobs
        WHERE job_id = ? AND owner = ?
        "#,
    )
    .bind(job_id.to_string())
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?;

    let mut job = row
        .map(job_from_row)
        .transpose()
        .map_err(|e| SelectError::Internal(e.to_string()))?
        .ok_or(SelectError::NotFound)?;

    if job.status != JobStatus::Completed {
        return Err(SelectError::NotCompleted);
    }
    if !job.artifacts.iter().any(|a| a == artifact) {
        return Err(SelectError::InvalidArtifact(artifact.to_string()));
    }

    sqlx::query("UPDATE portrait_jobs SET selected = ? WHERE job_id = ?")
        .bind(artifact)
        .bind(job_id.to_string())
        .execute(&mut *tx)
        .await?;

    // Cross-reference write: the performer record now points at the chosen
    // portrait. Same transaction, so callers observe select + portrait
    // update atomically.
    crate::db::artists::set_portrait(&mut tx, &job.request.artist, artifact).await?;

    tx.commit().await?;

    job.selected = Some(artifact.to_string());
    Ok(job)
}

/// Delete the job row; returns false when no owned row existed
pub async fn delete_job(pool: &SqlitePool, job_id: Uuid, owner: &str) -> Result<bool> {
    let rows = sqlx::query("DELETE FROM portrait_jobs WHERE job_id = ? AND owner = ?")
        .bind(job_id.to_string())
        .bind(owner)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows > 0)
}

/// Decode a portrait_jobs row
fn job_from_row(row: sqlx::sqlite::SqliteRow) -> Result<PortraitJob> {
    let job_id: String = row.get("job_id");
    let job_id = Uuid::parse_str(&job_id)
        .map_err(|e| Error::Internal(format!("Invalid job id in database: {}", e)))?;

    let status: String = row.get("status");
    let status = JobStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Invalid job status in database: {}", status)))?;

    let request: String = row.get("request");
    let request: PortraitRequest = serde_json::from_str(&request)
        .map_err(|e| Error::Internal(format!("Failed to deserialize request: {}", e)))?;

    let artifacts: String = row.get("artifacts");
    let artifacts: Vec<String> = serde_json::from_str(&artifacts)
        .map_err(|e| Error::Internal(format!("Failed to deserialize artifacts: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))
        })
        .transpose()?;

    Ok(PortraitJob {
        job_id,
        owner: row.get("owner"),
        status,
        request,
        artifacts,
        selected: row.get("selected"),
        error: row.get("error"),
        created_at,
        completed_at,
    })
}
