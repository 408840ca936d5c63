//! Prompt template API handlers

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use reelscout_common::models::Prompt;

use crate::error::ApiResult;
use crate::{db, AppState};

/// PATCH /api/prompts/{id} request. Only the provided fields change.
#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    pub prompt: Option<String>,
    pub is_active: Option<bool>,
}

/// GET /api/prompts
pub async fn list_prompts(State(state): State<AppState>) -> ApiResult<Json<Vec<Prompt>>> {
    let prompts = db::prompts::list_prompts(&state.db).await?;
    Ok(Json(prompts))
}

/// PATCH /api/prompts/{id}
pub async fn update_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<Uuid>,
    Json(request): Json<UpdatePromptRequest>,
) -> ApiResult<Json<Prompt>> {
    let prompt = db::prompts::update_prompt(
        &state.db,
        prompt_id,
        request.prompt.as_deref(),
        request.is_active,
    )
    .await?;

    tracing::info!(prompt_id = %prompt_id, kind = prompt.kind.as_str(), "Prompt updated");
    Ok(Json(prompt))
}

/// Build prompt routes
pub fn prompt_routes() -> Router<AppState> {
    Router::new()
        .route("/api/prompts", get(list_prompts))
        .route("/api/prompts/:id", axum::routing::patch(update_prompt))
}
