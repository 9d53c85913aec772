//! Similarity cache persistence (`similar_artists`)

use super::{placeholders, IN_CHUNK_SIZE};
use crate::discovery::models::{CandidateResult, SimilarArtistRow};
use chrono::{DateTime, Utc};
use scout_common::Result;
use sqlx::{Row, SqlitePool};

/// Insert or replace one cache row
///
/// Unique on (catalog_artist_id, name_lower, provider); a refetch overwrites
/// score, MBID, display name and fetch time.
pub async fn upsert_similar_artist(
    pool: &SqlitePool,
    catalog_artist_id: i64,
    result: &CandidateResult,
    fetched_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO similar_artists (
            catalog_artist_id, name, name_lower, mbid, score, provider, fetched_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(catalog_artist_id, name_lower, provider) DO UPDATE SET
            name = excluded.name,
            mbid = excluded.mbid,
            score = excluded.score,
            fetched_at = excluded.fetched_at
        "#,
    )
    .bind(catalog_artist_id)
    .bind(&result.name)
    .bind(&result.name_lower)
    .bind(&result.mbid)
    .bind(result.score)
    .bind(&result.provider)
    .bind(fetched_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load every cache row belonging to the given library artists
pub async fn load_similar_for_artists(
    pool: &SqlitePool,
    catalog_artist_ids: &[i64],
) -> Result<Vec<SimilarArtistRow>> {
    let mut result = Vec::new();

    for chunk in catalog_artist_ids.chunks(IN_CHUNK_SIZE) {
        let sql = format!(
            r#"
            SELECT catalog_artist_id, name, name_lower, mbid, score, provider, fetched_at
            FROM similar_artists
            WHERE catalog_artist_id IN ({})
            ORDER BY id
            "#,
            placeholders(chunk.len())
        );

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(*id);
        }

        let rows = query.fetch_all(pool).await?;
        result.extend(rows.iter().map(|row| SimilarArtistRow {
            catalog_artist_id: row.get("catalog_artist_id"),
            name: row.get("name"),
            name_lower: row.get("name_lower"),
            mbid: row.get("mbid"),
            score: row.get("score"),
            provider: row.get("provider"),
            fetched_at: row.get("fetched_at"),
        }));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::{load_catalog_artists, upsert_catalog_artist};
    use crate::db::test_support::memory_pool;

    async fn seed_artist(pool: &SqlitePool, name: &str) -> i64 {
        upsert_catalog_artist(pool, name, name, Utc::now()).await.unwrap();
        load_catalog_artists(pool)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.name == name)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_upsert_replaces_score_per_provider() {
        let pool = memory_pool().await;
        let id = seed_artist(&pool, "Radiohead").await;

        let first = CandidateResult::new("Muse", 0.5, None, "lastfm");
        let second = CandidateResult::new("Muse", 0.8, Some("mbid-muse".into()), "lastfm");
        let other_provider = CandidateResult::new("Muse", 0.6, None, "listenbrainz");

        upsert_similar_artist(&pool, id, &first, Utc::now()).await.unwrap();
        upsert_similar_artist(&pool, id, &second, Utc::now()).await.unwrap();
        upsert_similar_artist(&pool, id, &other_provider, Utc::now()).await.unwrap();

        let rows = load_similar_for_artists(&pool, &[id]).await.unwrap();
        assert_eq!(rows.len(), 2);

        let lastfm = rows.iter().find(|r| r.provider == "lastfm").unwrap();
        assert_eq!(lastfm.score, 0.8);
        assert_eq!(lastfm.mbid.as_deref(), Some("mbid-muse"));
    }

    #[tokio::test]
    async fn test_load_scoped_to_requested_artists() {
        let pool = memory_pool().await;
        let a = seed_artist(&pool, "Radiohead").await;
        let b = seed_artist(&pool, "Portishead").await;

        upsert_similar_artist(&pool, a, &CandidateResult::new("Muse", 0.5, None, "lastfm"), Utc::now())
            .await
            .unwrap();
        upsert_similar_artist(&pool, b, &CandidateResult::new("Tricky", 0.7, None, "lastfm"), Utc::now())
            .await
            .unwrap();

        let rows = load_similar_for_artists(&pool, &[b]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Tricky");

        assert!(load_similar_for_artists(&pool, &[]).await.unwrap().is_empty());
    }
}
