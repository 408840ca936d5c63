//! Prompt template database operations
//!
//! Two prompt kinds exist (analysis, comment) with exactly one active prompt
//! per kind expected. Defaults are seeded at startup when a kind has no
//! prompt at all; prompts are never auto-deleted.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use reelscout_common::models::{Prompt, PromptKind};
use reelscout_common::{Error, Result};

use super::sessions::parse_timestamp;

const DEFAULT_ANALYSIS_PROMPT: &str = "You are analyzing short-form videos for relevance to \
our audience. Given the video title, engagement counts, and a sample of viewer comments, \
respond with JSON: {\"relevanceScore\": 1-10, \"reasoning\": string, \"topics\": [string], \
\"engagementPotential\": 1-10}.";

const DEFAULT_COMMENT_PROMPT: &str = "You are writing a short, friendly reply to post under a \
video. Given the video title, its main topics, and a sample of existing comments, respond \
with JSON: {\"comment\": string, \"confidence\": 0-1}. Keep the reply under 150 characters \
and conversational.";

/// Seed a default active prompt for any kind that has none
pub async fn seed_default_prompts(pool: &SqlitePool) -> Result<()> {
    for (kind, text) in [
        (PromptKind::Analysis, DEFAULT_ANALYSIS_PROMPT),
        (PromptKind::Comment, DEFAULT_COMMENT_PROMPT),
    ] {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prompts WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(pool)
            .await?;

        if count == 0 {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                r#"
                INSERT INTO prompts (id, kind, prompt, is_active, created_at, updated_at)
                VALUES (?, ?, ?, 1, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(kind.as_str())
            .bind(text)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;

            tracing::info!(kind = kind.as_str(), "Seeded default prompt");
        }
    }

    Ok(())
}

/// All prompts, analysis before comment, newest first within a kind
pub async fn list_prompts(pool: &SqlitePool) -> Result<Vec<Prompt>> {
    let rows = sqlx::query("SELECT * FROM prompts ORDER BY kind ASC, created_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(prompt_from_row).collect()
}

/// Load a prompt by id
pub async fn get_prompt(pool: &SqlitePool, prompt_id: Uuid) -> Result<Option<Prompt>> {
    let row = sqlx::query("SELECT * FROM prompts WHERE id = ?")
        .bind(prompt_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| prompt_from_row(&r)).transpose()
}

/// The active prompt for a kind, if one is configured
pub async fn get_active_prompt(pool: &SqlitePool, kind: PromptKind) -> Result<Option<Prompt>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM prompts
        WHERE kind = ? AND is_active = 1
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(|r| prompt_from_row(&r)).transpose()
}

/// Update a prompt's text and/or active flag, returning the updated record
pub async fn update_prompt(
    pool: &SqlitePool,
    prompt_id: Uuid,
    text: Option<&str>,
    is_active: Option<bool>,
) -> Result<Prompt> {
    let mut prompt = get_prompt(pool, prompt_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Prompt not found: {}", prompt_id)))?;

    if let Some(text) = text {
        prompt.prompt = text.to_string();
    }
    if let Some(active) = is_active {
        prompt.is_active = active;
    }
    prompt.updated_at = Utc::now();

    sqlx::query("UPDATE prompts SET prompt = ?, is_active = ?, updated_at = ? WHERE id = ?")
        .bind(&prompt.prompt)
        .bind(prompt.is_active)
        .bind(prompt.updated_at.to_rfc3339())
        .bind(prompt_id.to_string())
        .execute(pool)
        .await?;

    Ok(prompt)
}

fn prompt_from_row(row: &SqliteRow) -> Result<Prompt> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse prompt id: {}", e)))?;

    let kind_str: String = row.get("kind");
    let kind = PromptKind::parse(&kind_str)
        .ok_or_else(|| Error::Internal(format!("Unknown prompt kind: {}", kind_str)))?;

    Ok(Prompt {
        id,
        kind,
        prompt: row.get("prompt"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}
