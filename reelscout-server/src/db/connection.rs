//! Driver connection singleton record operations
//!
//! Exactly one row (id = 1) records the automation driver's reachability.
//! Updates read-modify-write the whole record.

use sqlx::{Row, SqlitePool};

use reelscout_common::models::{ConnectionStatus, DriverConnection};
use reelscout_common::{Error, Result};

use super::sessions::parse_timestamp;

/// Load the singleton connection record, if one has been written
pub async fn get_connection(pool: &SqlitePool) -> Result<Option<DriverConnection>> {
    let row = sqlx::query("SELECT * FROM driver_connection WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    let row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let status_str: String = row.get("status");
    let status = ConnectionStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown connection status: {}", status_str)))?;

    let last_connected: Option<String> = row.get("last_connected");
    let last_connected = last_connected
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse last_connected: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(Some(DriverConnection {
        status,
        host: row.get("host"),
        port: row.get::<i64, _>("port") as u16,
        last_connected,
        error_message: row.get("error_message"),
        updated_at: parse_timestamp(&row, "updated_at")?,
    }))
}

/// Write the singleton connection record (insert or replace)
pub async fn save_connection(pool: &SqlitePool, connection: &DriverConnection) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO driver_connection (
            id, status, host, port, last_connected, error_message, updated_at
        ) VALUES (1, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            host = excluded.host,
            port = excluded.port,
            last_connected = excluded.last_connected,
            error_message = excluded.error_message,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(connection.status.as_str())
    .bind(&connection.host)
    .bind(connection.port as i64)
    .bind(connection.last_connected.map(|dt| dt.to_rfc3339()))
    .bind(&connection.error_message)
    .bind(connection.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}
