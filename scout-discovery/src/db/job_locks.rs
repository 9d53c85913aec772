//! Cross-process job locks (`job_locks`)
//!
//! Each scheduler tick runs a job in its own process, so "is the
//! ListenBrainz fetch running" has to be answered by the shared database
//! rather than an in-memory registry. A lock older than [`STALE_LOCK_HOURS`]
//! belongs to a process that died without releasing it and is ignored.

use chrono::{DateTime, Duration, Utc};
use scout_common::Result;
use sqlx::SqlitePool;

pub const STALE_LOCK_HOURS: i64 = 6;

fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(STALE_LOCK_HOURS)
}

/// Take the lock for `job_name`; `false` if another live holder has it
pub async fn acquire(pool: &SqlitePool, job_name: &str, now: DateTime<Utc>) -> Result<bool> {
    let cleared = sqlx::query("DELETE FROM job_locks WHERE job_name = ? AND acquired_at < ?")
        .bind(job_name)
        .bind(stale_cutoff(now))
        .execute(pool)
        .await?;

    if cleared.rows_affected() > 0 {
        tracing::warn!(job = job_name, "Cleared stale job lock");
    }

    let inserted = sqlx::query("INSERT OR IGNORE INTO job_locks (job_name, acquired_at) VALUES (?, ?)")
        .bind(job_name)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(inserted.rows_affected() > 0)
}

pub async fn release(pool: &SqlitePool, job_name: &str) -> Result<()> {
    sqlx::query("DELETE FROM job_locks WHERE job_name = ?")
        .bind(job_name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether a live lock exists for `job_name`
pub async fn is_held(pool: &SqlitePool, job_name: &str, now: DateTime<Utc>) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM job_locks WHERE job_name = ? AND acquired_at >= ?")
            .bind(job_name)
            .bind(stale_cutoff(now))
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
