//! Video record database operations

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use reelscout_common::models::{Video, VideoStatus};
use reelscout_common::{Error, Result};

use super::sessions::parse_timestamp;

/// Save a video record (insert or full update)
pub async fn save_video(pool: &SqlitePool, video: &Video) -> Result<()> {
    let extracted_comments = serde_json::to_string(&video.extracted_comments)
        .map_err(|e| Error::Internal(format!("Failed to serialize comments: {}", e)))?;
    let analysis_data = video
        .analysis_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to serialize analysis data: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO videos (
            id, session_id, url, title, thumbnail,
            likes, comments, shares, status,
            relevance_score, generated_comment, posted_comment, error_message,
            extracted_comments, analysis_data, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            thumbnail = excluded.thumbnail,
            likes = excluded.likes,
            comments = excluded.comments,
            shares = excluded.shares,
            status = excluded.status,
            relevance_score = excluded.relevance_score,
            generated_comment = excluded.generated_comment,
            posted_comment = excluded.posted_comment,
            error_message = excluded.error_message,
            extracted_comments = excluded.extracted_comments,
            analysis_data = excluded.analysis_data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(video.id.to_string())
    .bind(video.session_id.to_string())
    .bind(&video.url)
    .bind(&video.title)
    .bind(&video.thumbnail)
    .bind(video.likes as i64)
    .bind(video.comments as i64)
    .bind(video.shares as i64)
    .bind(video.status.as_str())
    .bind(video.relevance_score.map(|s| s as i64))
    .bind(&video.generated_comment)
    .bind(&video.posted_comment)
    .bind(&video.error_message)
    .bind(&extracted_comments)
    .bind(&analysis_data)
    .bind(video.created_at.to_rfc3339())
    .bind(video.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a video by id
pub async fn get_video(pool: &SqlitePool, video_id: Uuid) -> Result<Option<Video>> {
    let row = sqlx::query("SELECT * FROM videos WHERE id = ?")
        .bind(video_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| video_from_row(&r)).transpose()
}

/// All videos, newest first
pub async fn list_videos(pool: &SqlitePool) -> Result<Vec<Video>> {
    let rows = sqlx::query("SELECT * FROM videos ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(video_from_row).collect()
}

/// All videos belonging to one session, in creation order
pub async fn list_session_videos(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<Video>> {
    let rows = sqlx::query("SELECT * FROM videos WHERE session_id = ? ORDER BY created_at ASC")
        .bind(session_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(video_from_row).collect()
}

fn video_from_row(row: &SqliteRow) -> Result<Video> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse video id: {}", e)))?;

    let session_id_str: String = row.get("session_id");
    let session_id = Uuid::parse_str(&session_id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse session id: {}", e)))?;

    let status_str: String = row.get("status");
    let status = VideoStatus::parse(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown video status: {}", status_str)))?;

    let extracted_comments: String = row.get("extracted_comments");
    let extracted_comments: Vec<String> = serde_json::from_str(&extracted_comments)
        .map_err(|e| Error::Internal(format!("Failed to deserialize comments: {}", e)))?;

    let analysis_data: Option<String> = row.get("analysis_data");
    let analysis_data = analysis_data
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize analysis data: {}", e)))?;

    Ok(Video {
        id,
        session_id,
        url: row.get("url"),
        title: row.get("title"),
        thumbnail: row.get("thumbnail"),
        likes: row.get::<i64, _>("likes") as u64,
        comments: row.get::<i64, _>("comments") as u64,
        shares: row.get::<i64, _>("shares") as u64,
        status,
        relevance_score: row
            .get::<Option<i64>, _>("relevance_score")
            .map(|s| s as u8),
        generated_comment: row.get("generated_comment"),
        posted_comment: row.get("posted_comment"),
        error_message: row.get("error_message"),
        extracted_comments,
        analysis_data,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
