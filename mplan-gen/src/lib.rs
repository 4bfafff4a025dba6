//! mplan-gen library interface
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::config::GeneratorConfig;
use crate::services::{
    GenerationCoordinator, GenerationGuard, GeneratorInvoker, PortraitJobManager,
};
use mplan_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Per-actor concurrency guard
    pub guard: GenerationGuard,
    /// Synchronous generation coordinator
    pub coordinator: GenerationCoordinator,
    /// Async portrait job manager
    pub portrait_jobs: PortraitJobManager,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, config: &GeneratorConfig) -> Self {
        let song_invoker = GeneratorInvoker::new(&config.generate_program, &config.workdir);
        let portrait_invoker = GeneratorInvoker::new(&config.portrait_program, &config.workdir);

        let mut coordinator =
            GenerationCoordinator::new(song_invoker, db.clone(), event_bus.clone());
        if let Some(cap) = config.timeout_cap {
            coordinator = coordinator.with_timeout_cap(cap);
        }
        let portrait_jobs = PortraitJobManager::new(
            db.clone(),
            portrait_invoker,
            event_bus.clone(),
            config.portraits_dir.clone(),
            config.job_slots,
        );

        Self {
            db,
            event_bus,
            guard: GenerationGuard::new(),
            coordinator,
            portrait_jobs,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::generate_routes())
        .merge(api::job_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}
