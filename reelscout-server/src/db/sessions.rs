//! Scrape session database operations

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use reelscout_common::models::{ScrapeSession, SessionStatus};
use reelscout_common::{Error, Result};

/// Save a scrape session (insert or full update)
pub async fn save_session(pool: &SqlitePool, session: &ScrapeSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scrape_sessions (
            id, search_query, reel_count, status,
            processed_count, approved_count, rejected_count, error_count,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            processed_count = excluded.processed_count,
            approved_count = excluded.approved_count,
            rejected_count = excluded.rejected_count,
            error_count = excluded.error_count,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(session.id.to_string())
    .bind(&session.search_query)
    .bind(session.reel_count as i64)
    .bind(session.status.as_str())
    .bind(session.processed_count as i64)
    .bind(session.approved_count as i64)
    .bind(session.rejected_count as i64)
    .bind(session.error_count as i64)
    .bind(session.created_at.to_rfc3339())
    .bind(session.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a scrape session by id
pub async fn get_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<ScrapeSession>> {
    let row = sqlx::query("SELECT * FROM scrape_sessions WHERE id = ?")
        .bind(session_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| session_from_row(&r)).transpose()
}

/// The most recently created `running` session, if any
pub async fn get_active_session(pool: &SqlitePool) -> Result<Option<ScrapeSession>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM scrape_sessions
        WHERE status = 'running'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.map(|r| session_from_row(&r)).transpose()
}

/// All sessions, newest first
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<ScrapeSession>> {
    let rows = sqlx::query("SELECT * FROM scrape_sessions ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(session_from_row).collect()
}

/// Mark sessions left `running` by a previous process as `error`.
///
/// A session's background task dies with the process, so a `running` status
/// found at startup can never progress. The operator starts fresh.
pub async fn reconcile_stale_sessions(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE scrape_sessions
        SET status = 'error', updated_at = ?
        WHERE status = 'running'
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

fn session_from_row(row: &SqliteRow) -> Result<ScrapeSession> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse session id: {}", e)))?;

    let status_str: String = row.get("status");
    let status = SessionStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown session status: {}", status_str)))?;

    Ok(ScrapeSession {
        id,
        search_query: row.get("search_query"),
        reel_count: row.get::<i64, _>("reel_count") as u32,
        status,
        processed_count: row.get::<i64, _>("processed_count") as u32,
        approved_count: row.get::<i64, _>("approved_count") as u32,
        rejected_count: row.get::<i64, _>("rejected_count") as u32,
        error_count: row.get::<i64, _>("error_count") as u32,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

pub(crate) fn parse_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.get(column);
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
