//! Data models for mplan-gen (Generation Orchestrator service)
//!
//! - Generation request parameters and argument mapping
//! - Portrait job state machine
//! - Persisted song records

pub mod job;
pub mod request;
pub mod song;

pub use job::{JobStatus, PortraitJob, PortraitRequest, StatusTransition};
pub use request::{GenerationMode, GenerationRequest};
pub use song::SongRecord;
