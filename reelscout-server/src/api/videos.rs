//! Video API handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use reelscout_common::models::Video;
use reelscout_common::ReelEvent;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

/// PATCH /api/videos/{id} request. Only the provided fields change.
#[derive(Debug, Deserialize)]
pub struct UpdateVideoRequest {
    pub generated_comment: Option<String>,
    pub relevance_score: Option<u8>,
}

/// POST /api/videos/{id}/reject request
#[derive(Debug, Default, Deserialize)]
pub struct RejectVideoRequest {
    pub reason: Option<String>,
}

/// GET /api/videos
///
/// All videos, newest first.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<Video>>> {
    let videos = db::videos::list_videos(&state.db).await?;
    Ok(Json(videos))
}

/// GET /api/videos/{id}
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<Video>> {
    let video = db::videos::get_video(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Video not found: {}", video_id)))?;
    Ok(Json(video))
}

/// PATCH /api/videos/{id}
///
/// Operator edits before approval, typically tweaking the generated reply.
pub async fn update_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    Json(request): Json<UpdateVideoRequest>,
) -> ApiResult<Json<Video>> {
    let mut video = db::videos::get_video(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Video not found: {}", video_id)))?;

    if let Some(comment) = request.generated_comment {
        video.generated_comment = Some(comment);
    }
    if let Some(score) = request.relevance_score {
        if !(1..=10).contains(&score) {
            return Err(ApiError::BadRequest(
                "Relevance score must be between 1 and 10".to_string(),
            ));
        }
        video.relevance_score = Some(score);
    }
    video.updated_at = Utc::now();

    db::videos::save_video(&state.db, &video).await?;
    state.event_bus.emit_lossy(ReelEvent::VideoUpdated {
        video: video.clone(),
    });

    Ok(Json(video))
}

/// POST /api/videos/{id}/approve
///
/// Post the generated reply via the driver. Requires a pending video with a
/// generated comment.
pub async fn approve_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<Video>> {
    let video = state.orchestrator.approve_video(video_id).await?;
    Ok(Json(video))
}

/// POST /api/videos/{id}/reject
pub async fn reject_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    request: Option<Json<RejectVideoRequest>>,
) -> ApiResult<Json<Video>> {
    let reason = request.and_then(|Json(r)| r.reason);
    let video = state.orchestrator.reject_video(video_id, reason).await?;
    Ok(Json(video))
}

/// Build video routes
pub fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/api/videos", get(list_videos))
        .route("/api/videos/:id", get(get_video).patch(update_video))
        .route("/api/videos/:id/approve", post(approve_video))
        .route("/api/videos/:id/reject", post(reject_video))
}
