//! Synchronous generation coordinator
//!
//! Drives single-shot requests end to end within the calling request:
//! map the request to an argument vector, invoke the generator under its
//! mode timeout, parse the output, and persist a song record when an
//! artifact was produced. Record creation is all-or-nothing; no partial
//! record is ever written on a failed invocation.

use sqlx::SqlitePool;
use std::time::Duration;
use thiserror::Error;

use crate::models::{GenerationRequest, SongRecord};
use crate::services::invoker::{GeneratorInvoker, InvokeError};
use crate::services::parser::{self, GeneratorOutput};
use mplan_common::events::{EventBus, MplanEvent};

/// Timeout for metadata-only operations (artist roster listing)
const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinator failure taxonomy; every invocation-level fault resolves to
/// one of these, never an uncaught error past this boundary
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The generator exceeded its wall-clock budget
    #[error("Generation timed out after {0:?}")]
    TimedOut(Duration),

    /// The generator process could not be started
    #[error("Failed to launch generator: {0}")]
    LaunchFailed(String),

    /// The generator ran, signaled failure, and left no usable artifact
    #[error("Generator exited with code {exit_code:?} and produced no artifact")]
    ExecutionFailed {
        exit_code: Option<i32>,
        /// Cleaned output, kept for caller diagnostics
        output: String,
    },

    /// Request validation or persistence failure
    #[error(transparent)]
    Common(#[from] mplan_common::Error),
}

/// Result of one synchronous generation
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Persisted record; None when no artifact marker was present
    /// ("no output produced", not a hard error)
    pub record: Option<SongRecord>,
    /// Parsed marker fields
    pub parsed: GeneratorOutput,
    /// ANSI-stripped output text for display
    pub output: String,
    pub elapsed: Duration,
}

/// Synchronous generation coordinator service
#[derive(Clone)]
pub struct GenerationCoordinator {
    invoker: GeneratorInvoker,
    db: SqlitePool,
    event_bus: EventBus,
    timeout_cap: Option<Duration>,
}

impl GenerationCoordinator {
    pub fn new(invoker: GeneratorInvoker, db: SqlitePool, event_bus: EventBus) -> Self {
        Self {
            invoker,
            db,
            event_bus,
            timeout_cap: None,
        }
    }

    /// Cap every invocation budget at `cap`
    ///
    /// Deployments with a slow generator host can fail fast instead of
    /// holding request slots for the full per-mode budget.
    pub fn with_timeout_cap(mut self, cap: Duration) -> Self {
        self.timeout_cap = Some(cap);
        self
    }

    fn budget(&self, base: Duration) -> Duration {
        match self.timeout_cap {
            Some(cap) => base.min(cap),
            None => base,
        }
    }

    /// Run one single-shot generation on behalf of an actor
    ///
    /// The caller must already hold the actor's generation lease.
    pub async fn generate(
        &self,
        actor: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerateError> {
        let mode = request.mode();
        let args = request.to_args()?;

        self.event_bus.emit_lossy(MplanEvent::GenerationStarted {
            actor: actor.to_string(),
            mode: mode.as_str().to_string(),
            timestamp: chrono::Utc::now(),
        });

        let result = match self.invoker.invoke(&args, self.budget(mode.timeout())).await {
            Ok(result) => result,
            Err(InvokeError::TimedOut(budget)) => {
                self.emit_failed(actor, mode.as_str(), "timed out");
                return Err(GenerateError::TimedOut(budget));
            }
            Err(InvokeError::LaunchFailed(message)) => {
                self.emit_failed(actor, mode.as_str(), &message);
                return Err(GenerateError::LaunchFailed(message));
            }
        };

        // Two separate passes: marker extraction on the raw text, display
        // cleanup for everything returned to the caller.
        let parsed = parser::parse_markers(&result.output);
        let output = parser::strip_ansi(&result.output);

        let Some(artifact) = parsed.artifact.clone() else {
            if result.success() {
                // Generator succeeded without producing an artifact
                // (definition modes report ARTIST_FILE instead; some modes
                // legitimately yield text only). Caller decides
                // significance.
                tracing::info!(
                    actor,
                    mode = mode.as_str(),
                    "Generation finished without artifact marker"
                );
                self.event_bus.emit_lossy(MplanEvent::GenerationCompleted {
                    actor: actor.to_string(),
                    mode: mode.as_str().to_string(),
                    song_id: parsed.song_id,
                    artifact: None,
                    elapsed_ms: result.elapsed.as_millis() as u64,
                    timestamp: chrono::Utc::now(),
                });
                return Ok(GenerationOutcome {
                    record: None,
                    parsed,
                    output,
                    elapsed: result.elapsed,
                });
            }

            self.emit_failed(actor, mode.as_str(), "generator exited with failure");
            return Err(GenerateError::ExecutionFailed {
                exit_code: result.exit_code,
                output,
            });
        };

        // A non-zero exit with an artifact marker is a soft failure: the
        // generator may report one failed take while another succeeded.
        if !result.success() {
            tracing::warn!(
                actor,
                mode = mode.as_str(),
                exit_code = ?result.exit_code,
                "Generator signaled failure but produced an artifact; keeping it"
            );
        }

        let mut record = SongRecord::new(
            actor.to_string(),
            artifact.display().to_string(),
            mode.as_str().to_string(),
        );
        record.song_id = parsed.song_id;
        record.artist = request.artist.clone();
        record.concept = request.concept.clone();
        record.lyrics = parsed.lyrics.clone().or_else(|| request.lyrics.clone());

        crate::db::songs::insert_song(&self.db, &record).await?;

        tracing::info!(
            actor,
            mode = mode.as_str(),
            record_id = %record.record_id,
            song_id = ?record.song_id,
            artifact = %record.artifact,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Generation completed and persisted"
        );

        self.event_bus.emit_lossy(MplanEvent::GenerationCompleted {
            actor: actor.to_string(),
            mode: mode.as_str().to_string(),
            song_id: record.song_id,
            artifact: Some(record.artifact.clone()),
            elapsed_ms: result.elapsed.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        Ok(GenerationOutcome {
            record: Some(record),
            parsed,
            output,
            elapsed: result.elapsed,
        })
    }

    /// Metadata-only artist roster listing
    pub async fn list_artists(&self) -> Result<String, GenerateError> {
        self.metadata_query(&["--list".to_string()]).await
    }

    /// Metadata-only detail view of one artist definition
    pub async fn show_artist(&self, artist: &str) -> Result<String, GenerateError> {
        self.metadata_query(&["--show".to_string(), artist.to_string()])
            .await
    }

    async fn metadata_query(&self, args: &[String]) -> Result<String, GenerateError> {
        let result = self
            .invoker
            .invoke(args, self.budget(LISTING_TIMEOUT))
            .await
            .map_err(|e| match e {
                InvokeError::TimedOut(budget) => GenerateError::TimedOut(budget),
                InvokeError::LaunchFailed(message) => GenerateError::LaunchFailed(message),
            })?;

        Ok(parser::strip_ansi(&result.output))
    }

    fn emit_failed(&self, actor: &str, mode: &str, error: &str) {
        tracing::warn!(actor, mode, error, "Generation failed");
        self.event_bus.emit_lossy(MplanEvent::GenerationFailed {
            actor: actor.to_string(),
            mode: mode.to_string(),
            error: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
