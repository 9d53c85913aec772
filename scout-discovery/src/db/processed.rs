//! Processed recording markers (`processed_recordings`)

use chrono::Utc;
use scout_common::Result;
use sqlx::SqlitePool;

pub async fn is_processed(pool: &SqlitePool, mbid: &str, source: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM processed_recordings WHERE mbid = ? AND source = ?",
    )
    .bind(mbid)
    .bind(source)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn mark_processed(pool: &SqlitePool, mbid: &str, source: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO processed_recordings (mbid, source, processed_at) VALUES (?, ?, ?)",
    )
    .bind(mbid)
    .bind(source)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
