//! Similarity cache staleness

use super::models::CatalogArtist;
use chrono::{DateTime, Utc};

/// Library artists split by whether their cached similarity rows are usable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachePartition {
    /// Need a provider fetch
    pub stale: Vec<CatalogArtist>,
    /// Fetched within the TTL
    pub cached: Vec<CatalogArtist>,
}

/// Partition against the current wall clock
///
/// A TTL of 0 bypasses the cache entirely.
pub fn partition_by_cache_status(artists: Vec<CatalogArtist>, ttl_ms: u64) -> CachePartition {
    partition_at(artists, ttl_ms, Utc::now())
}

/// Partition against an explicit `now`
///
/// Input order is preserved within each half.
pub fn partition_at(artists: Vec<CatalogArtist>, ttl_ms: u64, now: DateTime<Utc>) -> CachePartition {
    let mut partition = CachePartition::default();

    for artist in artists {
        if is_stale(artist.last_similar_fetched_at, ttl_ms, now) {
            partition.stale.push(artist);
        } else {
            partition.cached.push(artist);
        }
    }

    partition
}

fn is_stale(last_fetched: Option<DateTime<Utc>>, ttl_ms: u64, now: DateTime<Utc>) -> bool {
    let Some(last_fetched) = last_fetched else {
        return true;
    };

    if ttl_ms == 0 {
        return true;
    }

    let age_ms = (now - last_fetched).num_milliseconds();
    // Timestamps in the future count as fresh
    age_ms > 0 && age_ms as u64 > ttl_ms
}
