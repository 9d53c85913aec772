//! Persistence for the discovery jobs
//!
//! Free functions per table (taking a `&SqlitePool`) plus [`SqliteStore`],
//! which bundles them behind the store traits the jobs depend on.

pub mod catalog;
pub mod discovered;
pub mod job_locks;
pub mod pending;
pub mod processed;
pub mod similar;

pub use pending::{NewPendingEntry, PendingKind, PendingSource};

use crate::discovery::models::{CandidateResult, CatalogArtist, SimilarArtistRow};
use crate::types::JobControl;
use chrono::{DateTime, Utc};
use scout_common::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Maximum bound parameters per `IN (...)` query
const IN_CHUNK_SIZE: usize = 500;

/// `?, ?, ?` for an `IN` clause of `n` parameters
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Catalog, similarity cache, and discovered-marker storage
#[async_trait::async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Insert or refresh a library artist keyed by normalized name
    async fn upsert_catalog_artist(
        &self,
        source_id: &str,
        name: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn catalog_artists(&self) -> Result<Vec<CatalogArtist>>;

    async fn set_artist_mbid(&self, artist_id: i64, mbid: &str) -> Result<()>;

    /// Insert or replace one cache row keyed by (artist, candidate, provider)
    async fn upsert_similar(
        &self,
        catalog_artist_id: i64,
        result: &CandidateResult,
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn mark_similar_fetched(
        &self,
        catalog_artist_id: i64,
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn similar_rows(&self, catalog_artist_ids: &[i64]) -> Result<Vec<SimilarArtistRow>>;

    /// Subset of `names_lower` that already carries a discovered marker
    async fn discovered_names(&self, names_lower: &[String]) -> Result<HashSet<String>>;

    /// Record a discovered marker; existing markers are left untouched
    async fn mark_discovered(&self, name_lower: &str, discovered_at: DateTime<Utc>) -> Result<()>;
}

/// Items awaiting user approval
#[async_trait::async_trait]
pub trait PendingQueue: Send + Sync {
    async fn is_pending(&self, mbid: &str) -> Result<bool>;
    async fn is_rejected(&self, mbid: &str) -> Result<bool>;
    /// `false` when the MBID was already queued in any status
    async fn add_pending(&self, entry: &NewPendingEntry) -> Result<bool>;
}

/// Recording/album MBIDs a recommendation source has already handled
#[async_trait::async_trait]
pub trait ProcessedRecordings: Send + Sync {
    async fn is_processed(&self, mbid: &str, source: &str) -> Result<bool>;
    async fn mark_processed(&self, mbid: &str, source: &str) -> Result<()>;
}

/// SQLite implementation of every store trait
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DiscoveryStore for SqliteStore {
    async fn upsert_catalog_artist(
        &self,
        source_id: &str,
        name: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        catalog::upsert_catalog_artist(&self.pool, source_id, name, synced_at).await
    }

    async fn catalog_artists(&self) -> Result<Vec<CatalogArtist>> {
        catalog::load_catalog_artists(&self.pool).await
    }

    async fn set_artist_mbid(&self, artist_id: i64, mbid: &str) -> Result<()> {
        catalog::set_artist_mbid(&self.pool, artist_id, mbid).await
    }

    async fn upsert_similar(
        &self,
        catalog_artist_id: i64,
        result: &CandidateResult,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        similar::upsert_similar_artist(&self.pool, catalog_artist_id, result, fetched_at).await
    }

    async fn mark_similar_fetched(
        &self,
        catalog_artist_id: i64,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        catalog::mark_similar_fetched(&self.pool, catalog_artist_id, fetched_at).await
    }

    async fn similar_rows(&self, catalog_artist_ids: &[i64]) -> Result<Vec<SimilarArtistRow>> {
        similar::load_similar_for_artists(&self.pool, catalog_artist_ids).await
    }

    async fn discovered_names(&self, names_lower: &[String]) -> Result<HashSet<String>> {
        discovered::load_discovered_names(&self.pool, names_lower).await
    }

    async fn mark_discovered(&self, name_lower: &str, discovered_at: DateTime<Utc>) -> Result<()> {
        discovered::mark_discovered(&self.pool, name_lower, discovered_at).await
    }
}

#[async_trait::async_trait]
impl PendingQueue for SqliteStore {
    async fn is_pending(&self, mbid: &str) -> Result<bool> {
        pending::has_status(&self.pool, mbid, pending::STATUS_PENDING).await
    }

    async fn is_rejected(&self, mbid: &str) -> Result<bool> {
        pending::has_status(&self.pool, mbid, pending::STATUS_REJECTED).await
    }

    async fn add_pending(&self, entry: &NewPendingEntry) -> Result<bool> {
        pending::add_pending(&self.pool, entry).await
    }
}

#[async_trait::async_trait]
impl ProcessedRecordings for SqliteStore {
    async fn is_processed(&self, mbid: &str, source: &str) -> Result<bool> {
        processed::is_processed(&self.pool, mbid, source).await
    }

    async fn mark_processed(&self, mbid: &str, source: &str) -> Result<()> {
        processed::mark_processed(&self.pool, mbid, source).await
    }
}

/// Cross-process view of running jobs
///
/// A lock table that cannot be read counts as "not running"; the caller
/// then proceeds as it would without the lock.
#[async_trait::async_trait]
impl JobControl for SqliteStore {
    async fn is_running(&self, job_name: &str) -> bool {
        match job_locks::is_held(&self.pool, job_name, Utc::now()).await {
            Ok(held) => held,
            Err(err) => {
                tracing::warn!(job = job_name, error = %err, "Job lock lookup failed");
                false
            }
        }
    }
}

impl SqliteStore {
    /// Claim `job_name` for this process; `false` if another process holds it
    pub async fn acquire_job_lock(&self, job_name: &str) -> Result<bool> {
        job_locks::acquire(&self.pool, job_name, Utc::now()).await
    }

    pub async fn release_job_lock(&self, job_name: &str) -> Result<()> {
        job_locks::release(&self.pool, job_name).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Single-connection in-memory pool with the full schema
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        scout_common::db::create_schema(&pool).await.unwrap();
        pool
    }
}
