//! Discovered-artist markers (`discovered_artists`)

use super::{placeholders, IN_CHUNK_SIZE};
use chrono::{DateTime, Utc};
use scout_common::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Insert a marker; a name that is already marked keeps its original timestamp
pub async fn mark_discovered(
    pool: &SqlitePool,
    name_lower: &str,
    discovered_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO discovered_artists (name_lower, discovered_at) VALUES (?, ?)")
        .bind(name_lower)
        .bind(discovered_at)
        .execute(pool)
        .await?;

    Ok(())
}

/// Which of `names_lower` already carry a marker
pub async fn load_discovered_names(
    pool: &SqlitePool,
    names_lower: &[String],
) -> Result<HashSet<String>> {
    let mut found = HashSet::new();

    for chunk in names_lower.chunks(IN_CHUNK_SIZE) {
        let sql = format!(
            "SELECT name_lower FROM discovered_artists WHERE name_lower IN ({})",
            placeholders(chunk.len())
        );

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for name in chunk {
            query = query.bind(name.as_str());
        }

        found.extend(query.fetch_all(pool).await?);
    }

    Ok(found)
}
