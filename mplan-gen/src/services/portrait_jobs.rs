//! Portrait job manager
//!
//! Multi-candidate portrait generation runs out-of-band: create() persists
//! a pending job row and returns its id immediately; a background task
//! claims the job, runs four independent generator invocations, copies
//! each produced artifact into the durable portrait area, and finalizes
//! the row. Callers poll, select among the produced candidates, and delete
//! jobs (reclaiming the artifact files).
//!
//! Background task concurrency is bounded by a semaphore so job
//! concurrency stays observable and limit-able.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::db::jobs::{self, SelectError};
use crate::models::{JobStatus, PortraitJob, PortraitRequest, StatusTransition};
use crate::services::guard::GenerationLease;
use crate::services::invoker::GeneratorInvoker;
use crate::services::parser;
use mplan_common::events::{EventBus, MplanEvent};
use mplan_common::{Error, Result};
use sqlx::SqlitePool;

/// Independent generation attempts per job
pub const CANDIDATES_PER_JOB: u32 = 4;

/// Wall-clock budget for one portrait candidate
const CANDIDATE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on concurrently running portrait jobs
pub const DEFAULT_JOB_SLOTS: usize = 2;

/// Portrait job manager service
#[derive(Clone)]
pub struct PortraitJobManager {
    db: SqlitePool,
    invoker: GeneratorInvoker,
    event_bus: EventBus,
    portraits_dir: PathBuf,
    job_slots: Arc<Semaphore>,
}

impl PortraitJobManager {
    pub fn new(
        db: SqlitePool,
        invoker: GeneratorInvoker,
        event_bus: EventBus,
        portraits_dir: PathBuf,
        job_slots: usize,
    ) -> Self {
        Self {
            db,
            invoker,
            event_bus,
            portraits_dir,
            job_slots: Arc::new(Semaphore::new(job_slots)),
        }
    }

    /// Create a job and hand it to a background worker
    ///
    /// Returns the job id without waiting for any generation to occur.
    /// The caller's generation lease moves into the worker task and is
    /// released when the task exits, on every path.
    pub async fn create(
        &self,
        owner: &str,
        request: PortraitRequest,
        lease: GenerationLease,
    ) -> Result<Uuid> {
        let job = PortraitJob::new(owner.to_string(), request);
        let job_id = job.job_id;

        jobs::insert_job(&self.db, &job).await?;

        tracing::info!(
            job_id = %job_id,
            owner,
            artist = %job.request.artist,
            "Portrait job created"
        );

        self.event_bus.emit_lossy(MplanEvent::PortraitJobCreated {
            job_id,
            actor: owner.to_string(),
            artist: job.request.artist.clone(),
            timestamp: chrono::Utc::now(),
        });

        let manager = self.clone();
        tokio::spawn(async move {
            // Keep the actor's slot claimed until the job finishes.
            let _lease = lease;

            let _permit = match manager.job_slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, shutting down
            };

            manager.run_job(job).await;
        });

        Ok(job_id)
    }

    /// Non-blocking job snapshot for the owning actor
    pub async fn get(&self, job_id: Uuid, owner: &str) -> Result<Option<PortraitJob>> {
        jobs::load_job(&self.db, job_id, owner).await
    }

    /// Select one of a completed job's artifacts as the performer portrait
    pub async fn select(
        &self,
        job_id: Uuid,
        owner: &str,
        artifact: &str,
    ) -> std::result::Result<PortraitJob, SelectError> {
        let job = jobs::select_artifact(&self.db, job_id, owner, artifact).await?;

        tracing::info!(
            job_id = %job_id,
            owner,
            artist = %job.request.artist,
            artifact,
            "Portrait selected"
        );

        self.event_bus.emit_lossy(MplanEvent::PortraitSelected {
            job_id,
            artist: job.request.artist.clone(),
            artifact: artifact.to_string(),
            timestamp: chrono::Utc::now(),
        });

        Ok(job)
    }

    /// Delete a job, reclaiming its artifact files
    ///
    /// Already-missing files are a no-op; the row is removed regardless.
    /// Returns false when no owned job existed.
    pub async fn delete(&self, job_id: Uuid, owner: &str) -> Result<bool> {
        let Some(job) = jobs::load_job(&self.db, job_id, owner).await? else {
            return Ok(false);
        };

        for artifact in &job.artifacts {
            match tokio::fs::remove_file(artifact).await {
                Ok(()) => {
                    tracing::debug!(job_id = %job_id, artifact, "Removed artifact file");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Already gone; deletion stays idempotent
                }
                Err(e) => {
                    // Leave the row in place so the caller can retry;
                    // dropping it now would orphan the remaining files.
                    return Err(Error::Internal(format!(
                        "Failed to remove artifact {}: {}",
                        artifact, e
                    )));
                }
            }
        }

        let removed = jobs::delete_job(&self.db, job_id, owner).await?;
        tracing::info!(job_id = %job_id, owner, removed, "Portrait job deleted");
        Ok(removed)
    }

    /// Background worker: claim, run candidates, finalize
    ///
    /// The in-memory job mirrors the row through `transition_to`; the
    /// status-predicated SQL updates remain the enforcement point.
    async fn run_job(&self, mut job: PortraitJob) {
        let job_id = job.job_id;

        match jobs::mark_generating(&self.db, job_id).await {
            Ok(true) => {
                self.emit_transition(&job.transition_to(JobStatus::Generating));
            }
            Ok(false) => {
                // Deleted before the worker started; nothing to do.
                tracing::warn!(job_id = %job_id, "Job no longer pending, worker exiting");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to claim job");
                let _ = jobs::finalize_failed(&self.db, job_id, &e.to_string()).await;
                return;
            }
        }

        let mut produced: Vec<String> = Vec::new();
        match self.run_candidates(&job, &mut produced).await {
            Ok(()) if !produced.is_empty() => {
                match jobs::finalize_completed(&self.db, job_id).await {
                    Ok(true) => {
                        tracing::info!(
                            job_id = %job_id,
                            artifacts = produced.len(),
                            "Portrait job completed"
                        );
                        self.emit_transition(&job.transition_to(JobStatus::Completed));
                    }
                    Ok(false) => {
                        tracing::warn!(job_id = %job_id, "Job vanished before finalize");
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to finalize job");
                    }
                }
            }
            Ok(()) => {
                self.fail_job(&mut job, "all candidates failed").await;
            }
            Err(e) => {
                // A fault outside the per-candidate loop discards the run.
                // Log what was already produced so the files stay
                // recoverable on disk.
                for path in &produced {
                    tracing::warn!(job_id = %job_id, artifact = %path, "Discarding produced artifact after job fault");
                }
                let message = e.to_string();
                self.fail_job(&mut job, &message).await;
            }
        }
    }

    /// Run the fixed candidate count; per-candidate failures are skipped,
    /// only infrastructure faults propagate
    async fn run_candidates(&self, job: &PortraitJob, produced: &mut Vec<String>) -> Result<()> {
        for take in 1..=CANDIDATES_PER_JOB {
            match self.run_candidate(job, take).await {
                Ok(artifact) => {
                    jobs::append_artifact(&self.db, job.job_id, &artifact).await?;
                    produced.push(artifact);
                    self.emit_candidate(job.job_id, take, true);
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.job_id,
                        take,
                        error = %e,
                        "Portrait candidate failed"
                    );
                    self.emit_candidate(job.job_id, take, false);
                }
            }
        }
        Ok(())
    }

    /// One independent candidate attempt: invoke, parse, copy into the
    /// durable portrait area under a name derived from job id and take
    async fn run_candidate(&self, job: &PortraitJob, take: u32) -> Result<String> {
        let mut args = vec![
            job.request.artist.clone(),
            "--framing".to_string(),
            job.request.framing.clone(),
            "--quality".to_string(),
            job.request.quality.clone(),
            // Attempt ordinal as seed: reproducible variation, stable
            // artifact ordering by attempt index
            "--seed".to_string(),
            take.to_string(),
        ];
        if let Some(appearance) = &job.request.appearance {
            args.push("--appearance".to_string());
            args.push(appearance.clone());
        }

        let result = self
            .invoker
            .invoke(&args, CANDIDATE_TIMEOUT)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        let parsed = parser::parse_markers(&result.output);
        let source = parsed.artifact.ok_or_else(|| {
            Error::Internal(format!(
                "no artifact marker in candidate output (exit code {:?})",
                result.exit_code
            ))
        })?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let dest = self
            .portraits_dir
            .join(format!("{}_take{}.{}", job.job_id, take, extension));

        tokio::fs::create_dir_all(&self.portraits_dir)
            .await
            .map_err(|e| Error::Internal(format!("Failed to create portrait dir: {}", e)))?;
        tokio::fs::copy(&source, &dest).await.map_err(|e| {
            Error::Internal(format!(
                "Failed to copy artifact {} -> {}: {}",
                source.display(),
                dest.display(),
                e
            ))
        })?;

        Ok(dest.display().to_string())
    }

    async fn fail_job(&self, job: &mut PortraitJob, error: &str) {
        match jobs::finalize_failed(&self.db, job.job_id, error).await {
            Ok(true) => {
                tracing::warn!(job_id = %job.job_id, error, "Portrait job failed");
                self.emit_transition(&job.transition_to(JobStatus::Failed));
            }
            Ok(false) => {
                tracing::warn!(job_id = %job.job_id, "Job vanished before failure finalize");
            }
            Err(e) => {
                tracing::error!(job_id = %job.job_id, error = %e, "Failed to mark job failed");
            }
        }
    }

    fn emit_transition(&self, transition: &StatusTransition) {
        self.event_bus
            .emit_lossy(MplanEvent::PortraitJobStateChanged {
                job_id: transition.job_id,
                old_status: transition.old_status.as_str().to_string(),
                new_status: transition.new_status.as_str().to_string(),
                timestamp: transition.transitioned_at,
            });
    }

    fn emit_candidate(&self, job_id: Uuid, take: u32, succeeded: bool) {
        self.event_bus
            .emit_lossy(MplanEvent::PortraitCandidateFinished {
                job_id,
                take,
                succeeded,
                timestamp: chrono::Utc::now(),
            });
    }
}
