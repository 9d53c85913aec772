//! Catalog discovery job
//!
//! Finds artists similar to the ones already in the library and queues
//! their albums for review.
//!
//! # State progression
//! SYNCING_SOURCES → RESOLVING_EXTERNAL_IDS → PARTITIONING_CACHE →
//! FETCHING_STALE → AGGREGATING → RANKING_AND_FILTERING →
//! ENRICHING_TOP_CANDIDATES → DONE
//!
//! Each state is handled by a `phase_*` method in its own file. The job
//! token is checked before every registry call; a fired token ends the run
//! as [`JobOutcome::Cancelled`], never as an empty completion.

use crate::db::{DiscoveryStore, PendingQueue};
use crate::discovery::models::DiscoveryReport;
use crate::error::{DiscoveryError, DiscoveryResult, JobOutcome};
use crate::jobs::LISTENBRAINZ_FETCH_JOB;
use crate::providers::SimilarityProvider;
use crate::types::{CoverArt, DetailRegistry, JobControl, NamingRegistry, SourceRegistry};
use scout_common::config::CatalogDiscoveryConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod phase_enriching;
mod phase_fetching;
mod phase_ranking;
mod phase_syncing;

/// Consecutive zero-result fetches that end the fetch phase early
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// Pause between successive per-artist fetches
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(1000);

/// Primary type requested from the detail registry
pub(crate) const ALBUM_PRIMARY_TYPE: &str = "Album";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryPhase {
    SyncingSources,
    ResolvingExternalIds,
    PartitioningCache,
    FetchingStale,
    Aggregating,
    RankingAndFiltering,
    EnrichingTopCandidates,
    Done,
}

impl DiscoveryPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryPhase::SyncingSources => "SYNCING_SOURCES",
            DiscoveryPhase::ResolvingExternalIds => "RESOLVING_EXTERNAL_IDS",
            DiscoveryPhase::PartitioningCache => "PARTITIONING_CACHE",
            DiscoveryPhase::FetchingStale => "FETCHING_STALE",
            DiscoveryPhase::Aggregating => "AGGREGATING",
            DiscoveryPhase::RankingAndFiltering => "RANKING_AND_FILTERING",
            DiscoveryPhase::EnrichingTopCandidates => "ENRICHING_TOP_CANDIDATES",
            DiscoveryPhase::Done => "DONE",
        }
    }
}

impl fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External collaborators the job is driven through
#[derive(Clone)]
pub struct DiscoveryCollaborators {
    /// Library to discover from (`None` = no library server configured)
    pub source: Option<Arc<dyn SourceRegistry>>,
    pub naming: Arc<dyn NamingRegistry>,
    pub details: Arc<dyn DetailRegistry>,
    pub cover_art: Arc<dyn CoverArt>,
    pub store: Arc<dyn DiscoveryStore>,
    pub pending: Arc<dyn PendingQueue>,
    pub jobs: Arc<dyn JobControl>,
}

/// Catalog discovery job
pub struct CatalogDiscoveryJob {
    config: CatalogDiscoveryConfig,
    collaborators: DiscoveryCollaborators,
    providers: Vec<Arc<dyn SimilarityProvider>>,
    fetch_delay: Duration,
}

impl CatalogDiscoveryJob {
    pub fn new(
        config: CatalogDiscoveryConfig,
        collaborators: DiscoveryCollaborators,
        providers: Vec<Arc<dyn SimilarityProvider>>,
    ) -> Self {
        Self {
            config,
            collaborators,
            providers,
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }

    pub fn with_fetch_delay(mut self, fetch_delay: Duration) -> Self {
        self.fetch_delay = fetch_delay;
        self
    }

    /// Providers with usable configuration, in registration order
    fn active_providers(&self) -> Vec<Arc<dyn SimilarityProvider>> {
        self.providers
            .iter()
            .filter(|provider| provider.is_configured())
            .cloned()
            .collect()
    }

    /// Run the job once
    ///
    /// Cancellation is reported as [`JobOutcome::Cancelled`]; any other
    /// failure is returned as an error. Cache rows and discovered markers
    /// written before a failure stay in place.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
    ) -> DiscoveryResult<JobOutcome<DiscoveryReport>> {
        if !self.config.enabled {
            tracing::info!("Catalog discovery disabled");
            return Ok(JobOutcome::Skipped("catalog discovery disabled".into()));
        }

        let Some(source) = self.collaborators.source.clone() else {
            tracing::info!("No library server configured; skipping catalog discovery");
            return Ok(JobOutcome::Skipped("no library server configured".into()));
        };

        let providers = self.active_providers();
        if providers.is_empty() {
            tracing::info!("No similarity provider configured; skipping catalog discovery");
            return Ok(JobOutcome::Skipped("no similarity provider configured".into()));
        }

        if self.collaborators.jobs.is_running(LISTENBRAINZ_FETCH_JOB).await {
            tracing::info!(
                running = LISTENBRAINZ_FETCH_JOB,
                "Deferring catalog discovery to running job"
            );
            return Ok(JobOutcome::Deferred(format!("{} is running", LISTENBRAINZ_FETCH_JOB)));
        }

        tracing::info!(
            providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            mode = ?self.config.mode,
            "Starting catalog discovery"
        );

        match self.execute(source.as_ref(), &providers, cancel).await {
            Ok(report) => {
                enter(DiscoveryPhase::Done);
                tracing::info!(
                    library_artists = report.library_artists,
                    fetched_artists = report.fetched_artists,
                    selected = report.selected_candidates,
                    added = report.added,
                    "Catalog discovery complete"
                );
                Ok(JobOutcome::Completed(report))
            }
            Err(DiscoveryError::Cancelled) => {
                tracing::info!("Catalog discovery cancelled");
                Ok(JobOutcome::Cancelled)
            }
            Err(err) => {
                tracing::error!(error = %err, "Catalog discovery failed");
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        source: &dyn SourceRegistry,
        providers: &[Arc<dyn SimilarityProvider>],
        cancel: &CancellationToken,
    ) -> DiscoveryResult<DiscoveryReport> {
        let mut report = DiscoveryReport::default();

        enter(DiscoveryPhase::SyncingSources);
        let library = self.phase_syncing(source, cancel).await?;
        report.library_artists = library.len();

        enter(DiscoveryPhase::ResolvingExternalIds);
        let (library, resolved) = self.phase_resolving(library, cancel).await?;
        report.resolved_mbids = resolved;

        enter(DiscoveryPhase::PartitioningCache);
        let partition = self.phase_partitioning(&library);
        report.cached_artists = partition.cached.len();

        enter(DiscoveryPhase::FetchingStale);
        let fetch = self.phase_fetching(&partition.stale, providers, cancel).await?;
        report.fetched_artists = fetch.fetched;
        report.circuit_breaker_tripped = fetch.circuit_breaker_tripped;

        enter(DiscoveryPhase::Aggregating);
        let aggregated = self.phase_aggregating(&library).await?;
        report.aggregated_candidates = aggregated.len();

        enter(DiscoveryPhase::RankingAndFiltering);
        let selected = self.phase_ranking(aggregated).await?;
        report.selected_candidates = selected.len();

        enter(DiscoveryPhase::EnrichingTopCandidates);
        report.added = self.phase_enriching(&selected, cancel).await?;

        Ok(report)
    }
}

fn enter(phase: DiscoveryPhase) {
    tracing::info!(phase = %phase, "Catalog discovery phase");
}
