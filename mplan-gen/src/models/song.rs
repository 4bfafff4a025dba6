//! Persisted synchronous generation result
//!
//! One successful synchronous generation yields at most one SongRecord.
//! Record creation is all-or-nothing: it only happens when the generator's
//! output carried an artifact marker, never on timeout or launch failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog row for one produced song (or definition file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongRecord {
    pub record_id: Uuid,
    /// Actor that requested the generation
    pub owner: String,
    /// Produced artifact path, as reported by the generator's marker
    pub artifact: String,
    /// Catalog id the generator assigned, when it reported one
    pub song_id: Option<i64>,
    /// Mode keyword of the originating request
    pub mode: String,
    pub artist: Option<String>,
    pub concept: Option<String>,
    /// Lyrics block extracted from the generator output, if present
    pub lyrics: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SongRecord {
    pub fn new(owner: String, artifact: String, mode: String) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            owner,
            artifact,
            song_id: None,
            mode,
            artist: None,
            concept: None,
            lyrics: None,
            created_at: Utc::now(),
        }
    }
}
