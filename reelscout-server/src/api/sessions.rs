//! Scrape session API handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use reelscout_common::models::ScrapeSession;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

/// POST /api/sessions/start request
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub query: String,
    pub reel_count: u32,
}

/// GET /api/sessions
///
/// All sessions, newest first.
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<ScrapeSession>>> {
    let sessions = db::sessions::list_sessions(&state.db).await?;
    Ok(Json(sessions))
}

/// GET /api/sessions/active
///
/// The currently running session, 404 when idle.
pub async fn get_active_session(State(state): State<AppState>) -> ApiResult<Json<ScrapeSession>> {
    let session = db::sessions::get_active_session(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active scrape session".to_string()))?;
    Ok(Json(session))
}

/// POST /api/sessions/start
///
/// Start a new scrape session. Returns the created session immediately;
/// reel processing runs in the background.
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<Json<ScrapeSession>> {
    let session = state
        .orchestrator
        .start_session(&request.query, request.reel_count)
        .await?;
    Ok(Json(session))
}

/// POST /api/sessions/{id}/stop
///
/// Stop a session. Idempotent.
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<ScrapeSession>> {
    let session = state.orchestrator.stop_session(session_id).await?;
    Ok(Json(session))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/active", get(get_active_session))
        .route("/api/sessions/start", post(start_session))
        .route("/api/sessions/:id/stop", post(stop_session))
}
