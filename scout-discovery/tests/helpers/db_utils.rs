//! Database test utilities

use chrono::{DateTime, Utc};
use scout_discovery::db::{DiscoveryStore, SqliteStore};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;

/// In-memory store with the full schema applied
pub async fn create_test_store() -> Arc<SqliteStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    scout_common::db::create_schema(&pool).await.unwrap();
    Arc::new(SqliteStore::new(pool))
}

/// Row count of `table`
pub async fn count_rows(store: &SqliteStore, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(store.pool())
        .await
        .unwrap()
}

/// Insert a library artist and optionally stamp its last fetch
pub async fn seed_catalog_artist(
    store: &SqliteStore,
    source_id: &str,
    name: &str,
    fetched_at: Option<DateTime<Utc>>,
) -> i64 {
    store
        .upsert_catalog_artist(source_id, name, Utc::now())
        .await
        .unwrap();

    let artist = store
        .catalog_artists()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.name == name)
        .unwrap();

    if let Some(at) = fetched_at {
        store.mark_similar_fetched(artist.id, at).await.unwrap();
    }
    artist.id
}
