//! Database initialization
//!
//! Creates the discovery cache, marker, pending queue, and job lock tables. Every
//! statement is idempotent so start-up can run it unconditionally.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // Cache rows are written one at a time while the job reads; WAL keeps
    // readers from blocking on that writer.
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all Scout tables on an already-open pool
///
/// Used directly by tests running against `sqlite::memory:`.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_catalog_artists_table(pool).await?;
    create_similar_artists_table(pool).await?;
    create_discovered_artists_table(pool).await?;
    create_pending_queue_table(pool).await?;
    create_processed_recordings_table(pool).await?;
    create_job_locks_table(pool).await?;
    Ok(())
}

async fn create_catalog_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id TEXT NOT NULL,
            name TEXT NOT NULL,
            name_lower TEXT NOT NULL UNIQUE,
            mbid TEXT,
            last_synced_at TIMESTAMP NOT NULL,
            last_similar_fetched_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_similar_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS similar_artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalog_artist_id INTEGER NOT NULL REFERENCES catalog_artists(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            name_lower TEXT NOT NULL,
            mbid TEXT,
            score REAL NOT NULL,
            provider TEXT NOT NULL,
            fetched_at TIMESTAMP NOT NULL,
            UNIQUE (catalog_artist_id, name_lower, provider)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_similar_artists_catalog ON similar_artists(catalog_artist_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_similar_artists_name ON similar_artists(name_lower)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_discovered_artists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discovered_artists (
            name_lower TEXT PRIMARY KEY,
            discovered_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_pending_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_queue (
            id TEXT PRIMARY KEY,
            mbid TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK (kind IN ('album', 'track')),
            artist TEXT NOT NULL,
            title TEXT NOT NULL,
            score REAL,
            source TEXT NOT NULL,
            similar_to TEXT NOT NULL DEFAULT '[]',
            source_track TEXT,
            cover_url TEXT,
            year INTEGER,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_processed_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed_recordings (
            mbid TEXT NOT NULL,
            source TEXT NOT NULL,
            processed_at TIMESTAMP NOT NULL,
            PRIMARY KEY (mbid, source)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per job running in any process sharing this database
async fn create_job_locks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_locks (
            job_name TEXT PRIMARY KEY,
            acquired_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
