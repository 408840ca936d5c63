//! Automation driver connection API handlers

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use reelscout_common::models::DriverConnection;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/driver/status
///
/// Current persisted connection record.
pub async fn driver_status(State(state): State<AppState>) -> ApiResult<Json<DriverConnection>> {
    let status = state.connection.status().await?;
    Ok(Json(status))
}

/// POST /api/driver/connect
///
/// Launch a detached connection attempt and answer 202 immediately. The
/// outcome arrives via the event stream and GET /api/driver/status.
pub async fn connect_driver(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.connection.spawn_connect();
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "connecting" })),
    )
}

/// POST /api/driver/disconnect
///
/// Idempotent teardown.
pub async fn disconnect_driver(
    State(state): State<AppState>,
) -> ApiResult<Json<DriverConnection>> {
    state.connection.disconnect().await?;
    let status = state.connection.status().await?;
    Ok(Json(status))
}

/// Build driver connection routes
pub fn connection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/driver/status", get(driver_status))
        .route("/api/driver/connect", post(connect_driver))
        .route("/api/driver/disconnect", post(disconnect_driver))
}
