//! Candidate ranking, selection, and display scores

use super::models::AggregatedCandidate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Bonus per additional provider that independently suggested a candidate
const PROVIDER_BONUS_STEP: f64 = 0.2;

/// Thresholds applied when selecting candidates
#[derive(Debug, Clone, Copy)]
pub struct SelectionCriteria {
    /// Minimum average similarity (0-1)
    pub min_similarity: f64,
    pub max_candidates: usize,
}

/// Filter, sort, and truncate aggregated candidates
///
/// 1. Drop already-discovered names
/// 2. Drop candidates without sources or below the average threshold
/// 3. Sort by provider count, then source count, then summed score (all descending)
/// 4. Keep the first `max_candidates`
pub fn select_candidates(
    aggregated: BTreeMap<String, AggregatedCandidate>,
    discovered: &HashSet<String>,
    criteria: SelectionCriteria,
) -> Vec<AggregatedCandidate> {
    let mut candidates: Vec<AggregatedCandidate> = aggregated
        .into_values()
        .filter(|c| !discovered.contains(&c.name_lower))
        .filter(|c| {
            c.average_score()
                .is_some_and(|avg| avg >= criteria.min_similarity)
        })
        .collect();

    candidates.sort_by(compare_candidates);
    candidates.truncate(criteria.max_candidates);
    candidates
}

/// Ranking comparator: "greater" candidates sort first
pub fn compare_candidates(a: &AggregatedCandidate, b: &AggregatedCandidate) -> Ordering {
    b.provider_count()
        .cmp(&a.provider_count())
        .then_with(|| b.source_count.cmp(&a.source_count))
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average match as a percent
///
/// Values at or below 1 are fractions and get scaled; anything larger is
/// taken to be a percent already.
pub fn normalize_score_to_percent(score: f64, source_count: u32) -> Option<f64> {
    if source_count == 0 {
        return None;
    }

    let average = score / f64::from(source_count);
    let percent = if average <= 1.0 { average * 100.0 } else { average };
    Some(round2(percent))
}

/// Weighted display score in percent, clamped to 0-100
///
/// `avg_percent * source_count * (1 + 0.2 * (providers - 1)) / similar_artist_limit`.
/// A limit of 0 falls back to the plain average.
pub fn weighted_score_percent(
    score: f64,
    source_count: u32,
    provider_count: usize,
    similar_artist_limit: u32,
) -> Option<f64> {
    let average_percent = normalize_score_to_percent(score, source_count)?;

    if similar_artist_limit == 0 {
        return Some(average_percent);
    }

    let extra_providers = provider_count.saturating_sub(1) as f64;
    let provider_bonus = 1.0 + extra_providers * PROVIDER_BONUS_STEP;
    let weighted = average_percent * f64::from(source_count) * provider_bonus
        / f64::from(similar_artist_limit);

    Some(round2(weighted.clamp(0.0, 100.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn candidate(name: &str, score: f64, sources: u32, providers: &[&str]) -> AggregatedCandidate {
        AggregatedCandidate {
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            score,
            source_count: sources,
            providers: providers.iter().map(|p| p.to_string()).collect(),
            similar_to: BTreeSet::new(),
        }
    }

    fn to_map(candidates: Vec<AggregatedCandidate>) -> BTreeMap<String, AggregatedCandidate> {
        candidates
            .into_iter()
            .map(|c| (c.name_lower.clone(), c))
            .collect()
    }

    fn criteria(min_similarity: f64, max_candidates: usize) -> SelectionCriteria {
        SelectionCriteria {
            min_similarity,
            max_candidates,
        }
    }

    fn names(candidates: &[AggregatedCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_provider_count_ranks_first() {
        let map = to_map(vec![
            candidate("High Score", 2.9, 3, &["lastfm"]),
            candidate("Both", 0.7, 1, &["lastfm", "listenbrainz"]),
            candidate("Other", 1.8, 2, &["listenbrainz"]),
        ]);

        let selected = select_candidates(map, &HashSet::new(), criteria(0.3, 10));
        assert_eq!(names(&selected), vec!["Both", "High Score", "Other"]);
    }

    #[test]
    fn test_tie_breaks_on_sources_then_score() {
        let map = to_map(vec![
            candidate("A", 0.9, 1, &["lastfm"]),
            candidate("B", 1.0, 2, &["lastfm"]),
            candidate("C", 1.6, 2, &["lastfm"]),
        ]);

        let selected = select_candidates(map, &HashSet::new(), criteria(0.3, 10));
        assert_eq!(names(&selected), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_filters_discovered_and_low_average() {
        let map = to_map(vec![
            candidate("Known", 0.9, 1, &["lastfm"]),
            candidate("Weak", 0.5, 2, &["lastfm"]),
            candidate("Empty", 0.0, 0, &["lastfm"]),
            candidate("Keep", 0.6, 2, &["lastfm"]),
        ]);
        let discovered = HashSet::from(["known".to_string()]);

        let selected = select_candidates(map, &discovered, criteria(0.3, 10));
        assert_eq!(names(&selected), vec!["Keep"]);
    }

    #[test]
    fn test_average_at_threshold_is_kept() {
        let map = to_map(vec![candidate("Edge", 0.6, 2, &["lastfm"])]);
        let selected = select_candidates(map, &HashSet::new(), criteria(0.3, 10));
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_truncates_to_max() {
        let map = to_map(
            (0..20)
                .map(|i| candidate(&format!("Artist {:02}", i), 0.5 + i as f64 / 100.0, 1, &["lastfm"]))
                .collect(),
        );

        let selected = select_candidates(map, &HashSet::new(), criteria(0.3, 5));
        assert_eq!(selected.len(), 5);
        assert_eq!(selected[0].name, "Artist 19");
    }

    #[test]
    fn test_normalize_score_to_percent() {
        assert_eq!(normalize_score_to_percent(0.9, 1), Some(90.0));
        assert_eq!(normalize_score_to_percent(1.7, 2), Some(85.0));
        assert_eq!(normalize_score_to_percent(0.12346, 1), Some(12.35));
        // Already a percent
        assert_eq!(normalize_score_to_percent(85.0, 1), Some(85.0));
        assert_eq!(normalize_score_to_percent(1.0, 0), None);
    }

    #[test]
    fn test_weighted_score_examples() {
        assert_eq!(weighted_score_percent(0.9, 1, 1, 10), Some(9.0));
        assert_eq!(weighted_score_percent(0.9, 1, 2, 10), Some(10.8));
        assert_eq!(weighted_score_percent(1.7, 2, 2, 10), Some(20.4));
    }

    #[test]
    fn test_weighted_score_edges() {
        // Zero limit falls back to the average
        assert_eq!(weighted_score_percent(0.9, 1, 2, 0), Some(90.0));
        // Clamped
        assert_eq!(weighted_score_percent(9.0, 10, 3, 1), Some(100.0));
        assert_eq!(weighted_score_percent(0.5, 0, 1, 10), None);
    }
}
