//! reelscout - Scraping session orchestration service
//!
//! Drives scraping sessions against the on-device automation driver, runs
//! each scraped reel through LLM analysis and reply generation, and serves
//! the operator dashboard API with a live SSE event stream.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reelscout_common::config::{Config, TomlConfig};
use reelscout_common::EventBus;
use reelscout_server::services::analysis::OpenAiClient;
use reelscout_server::services::driver::UiDriverClient;
use reelscout_server::services::{ConnectionManager, ReelAnalysisPipeline, SessionOrchestrator};
use reelscout_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting reelscout service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Config file path defaults to ./reelscout.toml
    let config_path = std::env::var("REELSCOUT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("reelscout.toml"));
    let toml = TomlConfig::load(&config_path)?;
    let config = Config::resolve(&toml);

    info!("Database: {}", config.database_path);
    let db_pool = reelscout_server::db::init_database_pool(Path::new(&config.database_path)).await?;
    info!("Database connection established");

    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    let driver = Arc::new(UiDriverClient::new(&config.driver_host, config.driver_port)?);
    let connection = Arc::new(ConnectionManager::new(
        db_pool.clone(),
        event_bus.clone(),
        driver.clone(),
        config.driver_host.clone(),
        config.driver_port,
    ));

    let llm = Arc::new(OpenAiClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    )?);
    let pipeline = Arc::new(ReelAnalysisPipeline::new(
        driver.clone(),
        llm.clone(),
        llm,
    ));

    let last_error = Arc::new(RwLock::new(None));
    let orchestrator = Arc::new(SessionOrchestrator::new(
        db_pool.clone(),
        event_bus.clone(),
        driver,
        pipeline,
        connection.clone(),
        last_error.clone(),
    ));

    let state = AppState::new(db_pool, event_bus, orchestrator, connection, last_error);
    let app = reelscout_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
