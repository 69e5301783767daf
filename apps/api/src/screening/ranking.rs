use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

/// One candidate's fused score and its two components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub candidate_id: String,
    pub final_score: f64,
    pub semantic_score: f64,
    pub coverage_score: f64,
}

/// Fused score: `alpha * semantic + (1 - alpha) * coverage`.
pub fn fuse(alpha: f64, semantic: f64, coverage: f64) -> f64 {
    alpha * semantic + (1.0 - alpha) * coverage
}

/// Combines semantic and coverage scores into a ranked list.
///
/// Candidates are taken from `semantic`; a candidate with no coverage entry
/// counts as `0.0`. Sorted by final score descending, ties broken by
/// candidate id ascending so the order never depends on map iteration.
pub fn rank(
    semantic: &HashMap<String, f64>,
    coverage: &HashMap<String, f64>,
    alpha: f64,
) -> Vec<ScoreRecord> {
    let mut records: Vec<ScoreRecord> = semantic
        .iter()
        .map(|(id, &semantic_score)| {
            let coverage_score = coverage.get(id).copied().unwrap_or(0.0);
            ScoreRecord {
                candidate_id: id.clone(),
                final_score: fuse(alpha, semantic_score, coverage_score),
                semantic_score,
                coverage_score,
            }
        })
        .collect();

    records.sort_by(compare_records);
    records
}

fn compare_records(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_fuse_weights_components() {
        // 0.7*0.8 + 0.3*0.5 = 0.56 + 0.15 = 0.71
        assert!((fuse(0.7, 0.8, 0.5) - 0.71).abs() < 1e-9);
        assert_eq!(fuse(1.0, 0.3, 0.9), 0.3);
        assert_eq!(fuse(0.0, 0.3, 0.9), 0.9);
    }

    #[test]
    fn test_rank_single_candidate() {
        let ranked = rank(&map(&[("A", 0.8)]), &map(&[("A", 0.5)]), 0.7);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate_id, "A");
        assert!((ranked[0].final_score - 0.71).abs() < 1e-9);
        assert_eq!(ranked[0].semantic_score, 0.8);
        assert_eq!(ranked[0].coverage_score, 0.5);
    }

    #[test]
    fn test_rank_orders_by_final_score_descending() {
        let semantic = map(&[("low", 0.1), ("high", 0.9), ("mid", 0.5)]);
        let coverage = map(&[("low", 0.0), ("high", 1.0), ("mid", 0.5)]);
        let ids: Vec<String> = rank(&semantic, &coverage, 0.7)
            .into_iter()
            .map(|r| r.candidate_id)
            .collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_rank_breaks_ties_by_id() {
        let semantic = map(&[("carol", 0.5), ("alice", 0.5), ("bob", 0.5)]);
        let coverage = map(&[("carol", 0.5), ("alice", 0.5), ("bob", 0.5)]);
        for _ in 0..5 {
            let ids: Vec<String> = rank(&semantic, &coverage, 0.7)
                .into_iter()
                .map(|r| r.candidate_id)
                .collect();
            assert_eq!(ids, vec!["alice", "bob", "carol"]);
        }
    }

    #[test]
    fn test_missing_coverage_counts_as_zero() {
        let ranked = rank(&map(&[("A", 1.0)]), &HashMap::new(), 0.5);
        assert_eq!(ranked[0].coverage_score, 0.0);
        assert_eq!(ranked[0].final_score, 0.5);
    }

    #[test]
    fn test_rank_output_is_non_increasing() {
        let semantic = map(&[("a", 0.3), ("b", 0.7), ("c", 0.7), ("d", 0.0), ("e", 0.95)]);
        let coverage = map(&[("a", 1.0), ("b", 0.2), ("c", 0.9), ("d", 0.4)]);
        let ranked = rank(&semantic, &coverage, 0.6);
        assert_eq!(ranked.len(), 5);
        for pair in ranked.windows(2) {
            assert!(pair[0].final_score >= pair[1].final_score);
        }
    }

    #[test]
    fn test_empty_input_gives_empty_ranking() {
        assert!(rank(&HashMap::new(), &HashMap::new(), 0.7).is_empty());
    }
}
