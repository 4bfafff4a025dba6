//! Per-actor concurrency guard
//!
//! At most one generation may be in flight per actor. The guard is a keyed
//! lease service: `try_acquire` either returns a lease token or signals
//! busy, and dropping the lease releases the actor's entry on every exit
//! path (success, error, timeout, or panic unwind), so a stuck entry can
//! never permanently lock an actor out.
//!
//! Entries for different actors are independent; two actors may generate
//! concurrently.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keyed mutual-exclusion service for generation requests
#[derive(Debug, Clone, Default)]
pub struct GenerationGuard {
    // std Mutex: lease release happens in Drop, which cannot await
    in_flight: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to claim the actor's generation slot
    ///
    /// Returns `None` when the actor already has a generation in flight.
    pub fn try_acquire(&self, actor: &str) -> Option<GenerationLease> {
        let mut map = self.in_flight.lock().expect("guard mutex poisoned");
        if map.contains_key(actor) {
            return None;
        }
        map.insert(actor.to_string(), Utc::now());
        Some(GenerationLease {
            actor: actor.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Whether the actor currently holds a lease
    pub fn is_busy(&self, actor: &str) -> bool {
        self.in_flight
            .lock()
            .expect("guard mutex poisoned")
            .contains_key(actor)
    }

    /// Number of actors with a generation in flight
    pub fn active_count(&self) -> usize {
        self.in_flight.lock().expect("guard mutex poisoned").len()
    }
}

/// Lease held for the duration of one generation; releases on drop
#[derive(Debug)]
pub struct GenerationLease {
    actor: String,
    in_flight: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl GenerationLease {
    pub fn actor(&self) -> &str {
        &self.actor
    }
}

impl Drop for GenerationLease {
    fn drop(&mut self) {
        if let Ok(mut map) = self.in_flight.lock() {
            map.remove(&self.actor);
        }
    }
}
