//! Fold cached similarity rows into per-candidate aggregates

use super::models::{AggregatedCandidate, SimilarArtistRow};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Fallback "similar to" label for a row whose library artist is unknown
const UNKNOWN_SOURCE: &str = "unknown";

/// Aggregate rows by normalized candidate name
///
/// - Rows naming an `excluded` artist (the library itself) are skipped
/// - Every remaining row adds its score and counts as one source
/// - `names_by_id` maps library artist IDs to display names for `similar_to`
///
/// Rows are folded in a canonical order, so the result does not depend on
/// the order of `rows` (floating point sums included).
pub fn aggregate_candidates(
    rows: &[SimilarArtistRow],
    excluded: &HashSet<String>,
    names_by_id: &HashMap<i64, String>,
) -> BTreeMap<String, AggregatedCandidate> {
    let mut ordered: Vec<&SimilarArtistRow> = rows
        .iter()
        .filter(|row| !excluded.contains(&row.name_lower))
        .collect();

    ordered.sort_by(|a, b| {
        a.name_lower
            .cmp(&b.name_lower)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.catalog_artist_id.cmp(&b.catalog_artist_id))
            .then_with(|| a.provider.cmp(&b.provider))
            .then_with(|| a.score.total_cmp(&b.score))
    });

    let mut map: BTreeMap<String, AggregatedCandidate> = BTreeMap::new();

    for row in ordered {
        let source_name = names_by_id
            .get(&row.catalog_artist_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SOURCE);

        let entry = map
            .entry(row.name_lower.clone())
            .or_insert_with(|| AggregatedCandidate {
                name: row.name.clone(),
                name_lower: row.name_lower.clone(),
                score: 0.0,
                source_count: 0,
                providers: BTreeSet::new(),
                similar_to: BTreeSet::new(),
            });

        entry.score += row.score;
        entry.source_count += 1;
        entry.providers.insert(row.provider.clone());
        entry.similar_to.insert(source_name.to_string());
    }

    map
}
