//! Library artist persistence (`catalog_artists`)

use crate::discovery::models::CatalogArtist;
use chrono::{DateTime, Utc};
use scout_common::{normalize_name, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn catalog_artist_from_row(row: &SqliteRow) -> CatalogArtist {
    CatalogArtist {
        id: row.get("id"),
        source_id: row.get("source_id"),
        name: row.get("name"),
        name_lower: row.get("name_lower"),
        mbid: row.get("mbid"),
        last_synced_at: row.get("last_synced_at"),
        last_similar_fetched_at: row.get("last_similar_fetched_at"),
    }
}

/// Insert or refresh a library artist, keyed by normalized name
///
/// An already-resolved MBID and fetch timestamp survive the refresh.
pub async fn upsert_catalog_artist(
    pool: &SqlitePool,
    source_id: &str,
    name: &str,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO catalog_artists (source_id, name, name_lower, last_synced_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(name_lower) DO UPDATE SET
            source_id = excluded.source_id,
            name = excluded.name,
            last_synced_at = excluded.last_synced_at
        "#,
    )
    .bind(source_id)
    .bind(name)
    .bind(normalize_name(name))
    .bind(synced_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every tracked library artist, ordered by insertion
pub async fn load_catalog_artists(pool: &SqlitePool) -> Result<Vec<CatalogArtist>> {
    let rows = sqlx::query(
        r#"
        SELECT id, source_id, name, name_lower, mbid, last_synced_at, last_similar_fetched_at
        FROM catalog_artists
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(catalog_artist_from_row).collect())
}

pub async fn set_artist_mbid(pool: &SqlitePool, artist_id: i64, mbid: &str) -> Result<()> {
    sqlx::query("UPDATE catalog_artists SET mbid = ? WHERE id = ?")
        .bind(mbid)
        .bind(artist_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn mark_similar_fetched(
    pool: &SqlitePool,
    artist_id: i64,
    fetched_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE catalog_artists SET last_similar_fetched_at = ? WHERE id = ?")
        .bind(fetched_at)
        .bind(artist_id)
        .execute(pool)
        .await?;

    Ok(())
}
