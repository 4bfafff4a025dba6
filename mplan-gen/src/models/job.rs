//! Portrait job state machine
//!
//! A portrait job progresses through a fixed set of states:
//! PENDING → GENERATING → COMPLETED | FAILED
//!
//! Transitions are monotone; a job never re-enters an earlier state after
//! reaching a terminal one. The database layer enforces the same ordering
//! with status-predicated updates (`db::jobs`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Portrait job workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Row created, worker not yet started
    Pending,
    /// Worker claimed the job, candidates in progress
    Generating,
    /// At least one candidate produced an artifact
    Completed,
    /// Zero artifacts, or the worker faulted outside the candidate loop
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "generating" => Some(JobStatus::Generating),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Whether the job has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `next` is a legal successor of this status
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Generating)
                | (JobStatus::Generating, JobStatus::Completed)
                | (JobStatus::Generating, JobStatus::Failed)
        )
    }
}

/// State transition record, broadcast for observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub job_id: Uuid,
    pub old_status: JobStatus,
    pub new_status: JobStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Portrait generation parameters, denormalized into the job row at
/// creation so the worker never needs the caller's live context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortraitRequest {
    /// Performer whose portrait is being generated; also the target of the
    /// cross-reference write when an artifact is selected
    pub artist: String,
    /// Shot framing: profile | headshot | shoulders | torso | full_body
    #[serde(default = "default_framing")]
    pub framing: String,
    /// Quality preset: draft | normal | high | ultra
    #[serde(default = "default_quality")]
    pub quality: String,
    /// Free-text appearance descriptors appended to the profile prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
}

fn default_framing() -> String {
    "headshot".to_string()
}

fn default_quality() -> String {
    "high".to_string()
}

/// Persisted portrait job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortraitJob {
    pub job_id: Uuid,
    /// Actor that created the job; all reads and mutations are owner-scoped
    pub owner: String,
    pub status: JobStatus,
    pub request: PortraitRequest,
    /// Produced artifact paths, ordered by attempt ordinal
    pub artifacts: Vec<String>,
    /// Selected artifact; set at most through select(), always a member of
    /// `artifacts`
    pub selected: Option<String>,
    /// Human-readable failure reason, only in the failed state
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PortraitJob {
    /// Create a new job in the pending state
    pub fn new(owner: String, request: PortraitRequest) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            owner,
            status: JobStatus::Pending,
            request,
            artifacts: Vec::new(),
            selected: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to a new status, returning the transition record
    ///
    /// Panics in debug builds on illegal transitions; release builds rely
    /// on the status-predicated SQL updates as the enforcement point.
    pub fn transition_to(&mut self, new_status: JobStatus) -> StatusTransition {
        debug_assert!(
            self.status.can_transition_to(new_status),
            "illegal job transition {:?} -> {:?}",
            self.status,
            new_status
        );
        let transition = StatusTransition {
            job_id: self.job_id,
            old_status: self.status,
            new_status,
            transitioned_at: Utc::now(),
        };
        self.status = new_status;
        if new_status.is_terminal() {
            self.completed_at = Some(transition.transitioned_at);
        }
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> PortraitRequest {
        PortraitRequest {
            artist: "nova".to_string(),
            framing: default_framing(),
            quality: default_quality(),
            appearance: None,
        }
    }

    #[test]
    fn new_job_starts_pending_with_empty_artifacts() {
        let job = PortraitJob::new("user-1".to_string(), test_request());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.artifacts.is_empty());
        assert!(job.selected.is_none());
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn pending_to_generating_to_completed() {
        let mut job = PortraitJob::new("user-1".to_string(), test_request());

        let t1 = job.transition_to(JobStatus::Generating);
        assert_eq!(t1.old_status, JobStatus::Pending);
        assert_eq!(t1.new_status, JobStatus::Generating);
        assert!(job.completed_at.is_none());

        let t2 = job.transition_to(JobStatus::Completed);
        assert_eq!(t2.old_status, JobStatus::Generating);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn generating_to_failed_is_terminal() {
        let mut job = PortraitJob::new("user-1".to_string(), test_request());
        job.transition_to(JobStatus::Generating);
        job.transition_to(JobStatus::Failed);
        assert!(job.status.is_terminal());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn transition_legality_matrix() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Generating));
        assert!(JobStatus::Generating.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Generating.can_transition_to(JobStatus::Failed));

        // No skips, no reversals, no exits from terminal states
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Generating.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Generating));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            JobStatus::Pending,
            JobStatus::Generating,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("cancelled"), None);
    }
}
