//! Synchronous generation API handlers
//!
//! POST /api/generate, POST /api/create/artist, POST /api/create/genre,
//! GET /api/artists

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::actor_from_headers;
use crate::error::{ApiError, ApiResult};
use crate::models::{GenerationMode, GenerationRequest};
use crate::AppState;

/// POST /api/generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    /// Cleaned generator output for display
    pub output: String,
    /// Produced artifact path, absent when no artifact marker was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
    pub elapsed_seconds: u64,
}

/// POST /api/generate
///
/// Runs one single-shot generation within the request, bounded by the
/// mode's timeout. Rejected with 409 when the actor already has a
/// generation in flight.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let actor = actor_from_headers(&headers)?;

    // Lease held across the whole invocation; released on every exit path
    // including timeout and error returns.
    let _lease = state.guard.try_acquire(&actor).ok_or_else(|| {
        ApiError::Conflict("A generation is already in progress for this actor".to_string())
    })?;

    let outcome = state.coordinator.generate(&actor, &request).await?;

    Ok(Json(GenerateResponse {
        success: true,
        output: outcome.output,
        audio_file: outcome.record.as_ref().map(|r| r.artifact.clone()),
        song_id: outcome.parsed.song_id,
        record_id: outcome.record.as_ref().map(|r| r.record_id),
        lyrics: outcome.parsed.lyrics,
        elapsed_seconds: outcome.elapsed.as_secs(),
    }))
}

/// POST /api/create/artist and /api/create/genre request
#[derive(Debug, Deserialize)]
pub struct CreateDefinitionRequest {
    pub description: String,
}

/// Definition creation response
#[derive(Debug, Serialize)]
pub struct CreateDefinitionResponse {
    pub success: bool,
    pub output: String,
    /// Path of the freshly written definition file, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_file: Option<String>,
}

/// POST /api/create/artist
pub async fn create_artist(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDefinitionRequest>,
) -> ApiResult<Json<CreateDefinitionResponse>> {
    create_definition(state, headers, GenerationMode::NewArtist, request).await
}

/// POST /api/create/genre
pub async fn create_genre(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDefinitionRequest>,
) -> ApiResult<Json<CreateDefinitionResponse>> {
    create_definition(state, headers, GenerationMode::NewGenre, request).await
}

async fn create_definition(
    state: AppState,
    headers: HeaderMap,
    mode: GenerationMode,
    request: CreateDefinitionRequest,
) -> ApiResult<Json<CreateDefinitionResponse>> {
    let actor = actor_from_headers(&headers)?;

    let _lease = state.guard.try_acquire(&actor).ok_or_else(|| {
        ApiError::Conflict("A generation is already in progress for this actor".to_string())
    })?;

    let generation_request = GenerationRequest {
        mode: Some(mode),
        description: Some(request.description),
        ..Default::default()
    };

    let outcome = state.coordinator.generate(&actor, &generation_request).await?;

    Ok(Json(CreateDefinitionResponse {
        success: true,
        output: outcome.output,
        definition_file: outcome
            .parsed
            .definition_file
            .map(|p| p.display().to_string()),
    }))
}

/// GET /api/artists response
#[derive(Debug, Serialize)]
pub struct ListArtistsResponse {
    pub output: String,
}

/// GET /api/artists
///
/// Metadata-only artist roster listing; short timeout, no guard needed.
pub async fn list_artists(State(state): State<AppState>) -> ApiResult<Json<ListArtistsResponse>> {
    let output = state.coordinator.list_artists().await?;
    Ok(Json(ListArtistsResponse { output }))
}

/// GET /api/artists/:artist
///
/// Detail view of one artist definition, through the same metadata path.
pub async fn show_artist(
    State(state): State<AppState>,
    axum::extract::Path(artist): axum::extract::Path<String>,
) -> ApiResult<Json<ListArtistsResponse>> {
    let output = state.coordinator.show_artist(&artist).await?;
    Ok(Json(ListArtistsResponse { output }))
}

/// Build synchronous generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/create/artist", post(create_artist))
        .route("/api/create/genre", post(create_genre))
        .route("/api/artists", get(list_artists))
        .route("/api/artists/:artist", get(show_artist))
}
