//! Database access for the ReelScout server
//!
//! SQLite via sqlx. Tables are created at pool init with
//! CREATE TABLE IF NOT EXISTS, default prompts are seeded when absent, and
//! sessions left `running` by a previous process are reconciled to `error`.

pub mod connection;
pub mod prompts;
pub mod sessions;
pub mod videos;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool.
///
/// Connects to the SQLite file at `db_path` (created if missing), creates
/// tables, seeds default prompts, and marks stale running sessions as error.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_schema(&pool).await?;

    Ok(pool)
}

/// Create tables, seed prompts, reconcile stale sessions.
///
/// Also used by tests against an in-memory pool.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    init_tables(pool).await?;
    prompts::seed_default_prompts(pool).await?;

    let stale = sessions::reconcile_stale_sessions(pool).await?;
    if stale > 0 {
        tracing::warn!(
            count = stale,
            "Marked stale running sessions as error (previous process died mid-session)"
        );
    }

    Ok(())
}

/// Create ReelScout tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scrape_sessions (
            id TEXT PRIMARY KEY,
            search_query TEXT NOT NULL,
            reel_count INTEGER NOT NULL,
            status TEXT NOT NULL,
            processed_count INTEGER NOT NULL DEFAULT 0,
            approved_count INTEGER NOT NULL DEFAULT 0,
            rejected_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            thumbnail TEXT,
            likes INTEGER NOT NULL DEFAULT 0,
            comments INTEGER NOT NULL DEFAULT 0,
            shares INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            relevance_score INTEGER,
            generated_comment TEXT,
            posted_comment TEXT,
            error_message TEXT,
            extracted_comments TEXT NOT NULL DEFAULT '[]',
            analysis_data TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prompts (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            prompt TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Singleton row, id fixed at 1
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS driver_connection (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            status TEXT NOT NULL,
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            last_connected TEXT,
            error_message TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (scrape_sessions, videos, prompts, driver_connection)"
    );

    Ok(())
}
