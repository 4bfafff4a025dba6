//! Event types for the MusePlan event system
//!
//! Provides shared event definitions and the EventBus used by the
//! generation orchestrator for SSE broadcasting.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// MusePlan event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission. All lifecycle events for synchronous generations and
/// portrait jobs use this central enum for exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MplanEvent {
    /// A synchronous generation started on behalf of an actor
    GenerationStarted {
        /// Actor that triggered the generation
        actor: String,
        /// Generation mode keyword (e.g. "standard", "collab")
        mode: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A synchronous generation finished successfully
    GenerationCompleted {
        actor: String,
        mode: String,
        /// Catalog id assigned by the generator, if it reported one
        song_id: Option<i64>,
        /// Produced artifact path, if an artifact marker was present
        artifact: Option<String>,
        /// Wall-clock generation time in milliseconds
        elapsed_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A synchronous generation failed (timeout, launch failure, hard exit)
    GenerationFailed {
        actor: String,
        mode: String,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A portrait job row was created
    PortraitJobCreated {
        job_id: Uuid,
        actor: String,
        artist: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A portrait job moved between workflow states
    PortraitJobStateChanged {
        job_id: Uuid,
        old_status: String,
        new_status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One portrait candidate finished (success or failure)
    PortraitCandidateFinished {
        job_id: Uuid,
        /// 1-based attempt ordinal
        take: u32,
        succeeded: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A portrait artifact was selected as the performer's portrait
    PortraitSelected {
        job_id: Uuid,
        artist: String,
        artifact: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MplanEvent {
    /// Event type name for SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            MplanEvent::GenerationStarted { .. } => "GenerationStarted",
            MplanEvent::GenerationCompleted { .. } => "GenerationCompleted",
            MplanEvent::GenerationFailed { .. } => "GenerationFailed",
            MplanEvent::PortraitJobCreated { .. } => "PortraitJobCreated",
            MplanEvent::PortraitJobStateChanged { .. } => "PortraitJobStateChanged",
            MplanEvent::PortraitCandidateFinished { .. } => "PortraitCandidateFinished",
            MplanEvent::PortraitSelected { .. } => "PortraitSelected",
        }
    }
}

/// Broadcast event bus shared between services and the SSE endpoint
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MplanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MplanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    pub fn emit(
        &self,
        event: MplanEvent,
    ) -> Result<usize, broadcast::error::SendError<MplanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Lifecycle events are informational; generation must proceed whether
    /// or not an SSE client is connected.
    pub fn emit_lossy(&self, event: MplanEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
