//! Data types flowing through the discovery pipeline

use chrono::{DateTime, Utc};
use scout_common::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Library artist tracked from the source registry
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogArtist {
    pub id: i64,
    /// Identifier assigned by the source registry
    pub source_id: String,
    pub name: String,
    pub name_lower: String,
    /// MusicBrainz artist ID, resolved lazily
    pub mbid: Option<String>,
    pub last_synced_at: DateTime<Utc>,
    /// Last completed provider fetch cycle (`None` = never fetched)
    pub last_similar_fetched_at: Option<DateTime<Utc>>,
}

/// One provider's opinion about one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub name_lower: String,
    /// Match strength, 0.0-1.0
    pub score: f64,
    pub mbid: Option<String>,
    pub provider: String,
}

impl CandidateResult {
    pub fn new(
        name: impl Into<String>,
        score: f64,
        mbid: Option<String>,
        provider: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            name_lower: normalize_name(&name),
            name,
            score,
            mbid: mbid.filter(|m| !m.is_empty()),
            provider: provider.into(),
        }
    }
}

/// Persisted cache row: a [`CandidateResult`] tied to the library artist it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarArtistRow {
    pub catalog_artist_id: i64,
    pub name: String,
    pub name_lower: String,
    pub mbid: Option<String>,
    pub score: f64,
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
}

/// Per-candidate fold over every cache row that mentions it
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedCandidate {
    pub name: String,
    pub name_lower: String,
    /// Sum of raw scores across contributing rows
    pub score: f64,
    /// Contributing rows (one per library artist per provider)
    pub source_count: u32,
    pub providers: BTreeSet<String>,
    /// Display names of the library artists that suggested this candidate
    pub similar_to: BTreeSet<String>,
}

impl AggregatedCandidate {
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.source_count == 0 {
            None
        } else {
            Some(self.score / f64::from(self.source_count))
        }
    }
}

/// Counters reported at the end of a catalog discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub library_artists: usize,
    pub resolved_mbids: usize,
    pub cached_artists: usize,
    pub fetched_artists: usize,
    /// Fetch phase ended early on result starvation
    pub circuit_breaker_tripped: bool,
    pub aggregated_candidates: usize,
    pub selected_candidates: usize,
    /// Albums queued (or logged in auto mode)
    pub added: usize,
}
