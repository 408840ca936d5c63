//! ReelScout server library
//!
//! Exposes the application state, router, and service layer for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use reelscout_common::EventBus;
use services::{ConnectionManager, SessionOrchestrator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Scrape session orchestrator
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Automation driver connection manager
    pub connection: Arc<ConnectionManager>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        orchestrator: Arc<SessionOrchestrator>,
        connection: Arc<ConnectionManager>,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            db,
            event_bus,
            orchestrator,
            connection,
            startup_time: Utc::now(),
            last_error,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::session_routes())
        .merge(api::video_routes())
        .merge(api::prompt_routes())
        .merge(api::connection_routes())
        .route("/api/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
