//! AGGREGATING and RANKING_AND_FILTERING

use super::CatalogDiscoveryJob;
use crate::discovery::aggregate::aggregate_candidates;
use crate::discovery::models::{AggregatedCandidate, CatalogArtist};
use crate::discovery::ranking::{select_candidates, SelectionCriteria};
use crate::error::DiscoveryResult;
use std::collections::{BTreeMap, HashMap, HashSet};

impl CatalogDiscoveryJob {
    /// Fold every cached row of the current library into candidates
    pub(super) async fn phase_aggregating(
        &self,
        library: &[CatalogArtist],
    ) -> DiscoveryResult<BTreeMap<String, AggregatedCandidate>> {
        let ids: Vec<i64> = library.iter().map(|a| a.id).collect();
        let rows = self.collaborators.store.similar_rows(&ids).await?;

        let excluded: HashSet<String> = library.iter().map(|a| a.name_lower.clone()).collect();
        let names_by_id: HashMap<i64, String> =
            library.iter().map(|a| (a.id, a.name.clone())).collect();

        let aggregated = aggregate_candidates(&rows, &excluded, &names_by_id);
        tracing::info!(
            rows = rows.len(),
            candidates = aggregated.len(),
            "Similarity rows aggregated"
        );
        Ok(aggregated)
    }

    pub(super) async fn phase_ranking(
        &self,
        aggregated: BTreeMap<String, AggregatedCandidate>,
    ) -> DiscoveryResult<Vec<AggregatedCandidate>> {
        let names: Vec<String> = aggregated.keys().cloned().collect();
        let discovered = self.collaborators.store.discovered_names(&names).await?;

        let criteria = SelectionCriteria {
            min_similarity: self.config.min_similarity,
            max_candidates: self.config.max_artists_per_run,
        };
        let selected = select_candidates(aggregated, &discovered, criteria);

        tracing::info!(
            already_discovered = discovered.len(),
            selected = selected.len(),
            "Candidates ranked"
        );
        Ok(selected)
    }
}
