//! ENRICHING_TOP_CANDIDATES
//!
//! Look up albums for each selected candidate, queue the new ones, and mark
//! the candidate discovered.

use super::{CatalogDiscoveryJob, ALBUM_PRIMARY_TYPE};
use crate::db::{NewPendingEntry, PendingKind, PendingSource};
use crate::discovery::models::AggregatedCandidate;
use crate::discovery::ranking::weighted_score_percent;
use crate::error::{ensure_not_cancelled, DiscoveryResult};
use chrono::Utc;
use scout_common::config::ApprovalMode;
use tokio_util::sync::CancellationToken;

impl CatalogDiscoveryJob {
    /// Returns the number of albums queued (or logged, in auto mode)
    pub(super) async fn phase_enriching(
        &self,
        selected: &[AggregatedCandidate],
        cancel: &CancellationToken,
    ) -> DiscoveryResult<usize> {
        let mut added = 0;

        for candidate in selected {
            ensure_not_cancelled(cancel)?;

            added += self.enrich_candidate(candidate, cancel).await?;

            self.collaborators
                .store
                .mark_discovered(&candidate.name_lower, Utc::now())
                .await?;
        }

        Ok(added)
    }

    /// Queue albums for one candidate
    ///
    /// A failed album lookup fails the run; the candidate stays unmarked.
    async fn enrich_candidate(
        &self,
        candidate: &AggregatedCandidate,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<usize> {
        let budget = self.config.albums_per_artist;

        let groups = self
            .collaborators
            .details
            .search_release_groups(&candidate.name, ALBUM_PRIMARY_TYPE, budget, cancel)
            .await?;

        let score = weighted_score_percent(
            candidate.score,
            candidate.source_count,
            candidate.provider_count(),
            self.config.similar_artist_limit,
        );
        let similar_to: Vec<String> = candidate.similar_to.iter().cloned().collect();

        let mut added = 0usize;
        for group in groups {
            if added >= budget as usize {
                break;
            }

            let pending = &self.collaborators.pending;
            if pending.is_pending(&group.id).await? || pending.is_rejected(&group.id).await? {
                tracing::debug!(album = %group.title, mbid = %group.id, "Album already pending or rejected");
                continue;
            }

            match self.config.mode {
                ApprovalMode::Manual => {
                    let entry = NewPendingEntry {
                        mbid: group.id.clone(),
                        kind: PendingKind::Album,
                        artist: candidate.name.clone(),
                        title: group.title.clone(),
                        score,
                        source: PendingSource::Catalog,
                        similar_to: similar_to.clone(),
                        source_track: None,
                        cover_url: self.collaborators.cover_art.cover_url(&group.id),
                        year: group.year(),
                    };
                    if !pending.add_pending(&entry).await? {
                        tracing::debug!(album = %group.title, mbid = %group.id, "Album already queued");
                        continue;
                    }
                    tracing::info!(
                        artist = %candidate.name,
                        album = %group.title,
                        score = ?score,
                        similar_to = ?similar_to,
                        "Album queued for review"
                    );
                }
                ApprovalMode::Auto => {
                    tracing::info!(
                        artist = %candidate.name,
                        album = %group.title,
                        "Auto approval not implemented; album not queued"
                    );
                }
            }
            added += 1;
        }

        Ok(added)
    }
}
