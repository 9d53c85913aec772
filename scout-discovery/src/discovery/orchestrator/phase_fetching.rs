//! PARTITIONING_CACHE and FETCHING_STALE

use super::{CatalogDiscoveryJob, CIRCUIT_BREAKER_THRESHOLD};
use crate::discovery::cache::{partition_by_cache_status, CachePartition};
use crate::discovery::fanout::fetch_from_all;
use crate::discovery::models::CatalogArtist;
use crate::error::{ensure_not_cancelled, DiscoveryResult};
use crate::http::sleep_or_cancel;
use crate::providers::SimilarityProvider;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fetch phase counters
#[derive(Debug, Default)]
pub(super) struct FetchSummary {
    pub fetched: usize,
    pub circuit_breaker_tripped: bool,
}

impl CatalogDiscoveryJob {
    pub(super) fn phase_partitioning(&self, library: &[CatalogArtist]) -> CachePartition {
        let partition = partition_by_cache_status(library.to_vec(), self.config.cache_ttl_ms());
        tracing::info!(
            stale = partition.stale.len(),
            cached = partition.cached.len(),
            "Similarity cache partitioned"
        );
        partition
    }

    /// Fetch and cache similar artists for every stale library artist
    ///
    /// Artists are fetched one at a time with `fetch_delay` between them.
    /// After [`CIRCUIT_BREAKER_THRESHOLD`] consecutive empty fetches the
    /// phase stops; the artist that tripped it is left stale.
    pub(super) async fn phase_fetching(
        &self,
        stale: &[CatalogArtist],
        providers: &[Arc<dyn SimilarityProvider>],
        cancel: &CancellationToken,
    ) -> DiscoveryResult<FetchSummary> {
        let mut summary = FetchSummary::default();
        let mut consecutive_empty = 0u32;
        let timeout = self.config.provider_timeout();

        for (index, artist) in stale.iter().enumerate() {
            ensure_not_cancelled(cancel)?;
            if index > 0 {
                sleep_or_cancel(self.fetch_delay, cancel).await?;
            }

            let results = fetch_from_all(
                providers,
                &artist.name,
                artist.mbid.as_deref(),
                self.config.similar_artist_limit,
                timeout,
                cancel,
            )
            .await;
            ensure_not_cancelled(cancel)?;

            if results.is_empty() {
                consecutive_empty += 1;
                if consecutive_empty >= CIRCUIT_BREAKER_THRESHOLD {
                    tracing::warn!(
                        consecutive_empty,
                        remaining = stale.len() - index - 1,
                        "No similar artists from any provider; stopping fetch phase"
                    );
                    summary.circuit_breaker_tripped = true;
                    break;
                }
            } else {
                consecutive_empty = 0;
            }

            let fetched_at = Utc::now();
            for result in &results {
                self.collaborators
                    .store
                    .upsert_similar(artist.id, result, fetched_at)
                    .await?;
            }
            self.collaborators
                .store
                .mark_similar_fetched(artist.id, fetched_at)
                .await?;

            tracing::debug!(artist = %artist.name, results = results.len(), "Similar artists cached");
            summary.fetched += 1;
        }

        tracing::info!(
            fetched = summary.fetched,
            circuit_breaker = summary.circuit_breaker_tripped,
            "Fetch phase complete"
        );
        Ok(summary)
    }
}
