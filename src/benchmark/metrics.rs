//! Recall of approximate results against exact ones.

use std::collections::HashSet;

use super::ground_truth::GroundTruth;
use crate::error::{IndexError, Result};
use crate::search::SearchResult;

/// Compute recall@k: fraction of true k-nearest neighbors that were retrieved.
///
/// recall@k = |retrieved ∩ ground_truth| / k
///
/// Only the first `k` entries of each list are considered.
pub fn recall_at_k(ground_truth: &[u32], retrieved: &[u32], k: usize) -> f64 {
    if k == 0 || ground_truth.is_empty() {
        return 0.0;
    }

    let gt_set: HashSet<u32> = ground_truth.iter().take(k).copied().collect();
    let hits = retrieved
        .iter()
        .take(k)
        .copied()
        .collect::<HashSet<u32>>()
        .intersection(&gt_set)
        .count();
    hits as f64 / k as f64
}

/// Mean recall@k of a query batch.
///
/// The ground truth must hold at least `k` neighbors per query and one row per
/// result.
pub fn mean_recall(results: &[SearchResult], ground_truth: &GroundTruth, k: usize) -> Result<f64> {
    if results.len() != ground_truth.len() {
        return Err(IndexError::InvalidParameter(format!(
            "{} results but ground truth covers {} queries",
            results.len(),
            ground_truth.len()
        )));
    }
    if k > ground_truth.results_per_query() {
        return Err(IndexError::InvalidParameter(format!(
            "k = {k} exceeds the {} neighbors stored per query",
            ground_truth.results_per_query()
        )));
    }
    if results.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = results
        .iter()
        .enumerate()
        .map(|(i, r)| recall_at_k(ground_truth.neighbors(i), &r.ids(), k))
        .sum();
    Ok(total / results.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchStats;

    fn result(ids: &[u32]) -> SearchResult {
        SearchResult {
            neighbors: ids.iter().map(|&id| (id, 0.0)).collect(),
            stats: SearchStats::default(),
        }
    }

    #[test]
    fn test_recall_at_k() {
        let gt = vec![1, 2, 3, 4, 5];
        let retrieved = vec![1, 2, 3, 6, 7];
        assert!((recall_at_k(&gt, &retrieved, 5) - 0.6).abs() < 1e-9);

        // Perfect recall
        let perfect = vec![5, 4, 3, 2, 1];
        assert!((recall_at_k(&gt, &perfect, 5) - 1.0).abs() < 1e-9);

        // Zero recall
        let miss = vec![6, 7, 8, 9, 10];
        assert_eq!(recall_at_k(&gt, &miss, 5), 0.0);
    }

    #[test]
    fn recall_only_looks_at_top_k() {
        // true top-2 is {1, 2}; the 2 at position 3 does not count
        assert!((recall_at_k(&[1, 2, 3], &[1, 9, 2], 2) - 0.5).abs() < 1e-9);
        // short result lists are still divided by k
        assert!((recall_at_k(&[1, 2, 3, 4], &[1], 4) - 0.25).abs() < 1e-9);
        assert_eq!(recall_at_k(&[1, 2], &[1, 2], 0), 0.0);
    }

    #[test]
    fn mean_recall_over_batch() {
        let gt = GroundTruth::new(vec![0, 1, 2, 3], vec![0.0; 4], 2, 2).unwrap();
        let results = vec![result(&[0, 1]), result(&[3, 9])];
        let r = mean_recall(&results, &gt, 2).unwrap();
        assert!((r - 0.75).abs() < 1e-9);

        let r1 = mean_recall(&results, &gt, 1).unwrap();
        assert!((r1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn mean_recall_checks_shapes() {
        let gt = GroundTruth::new(vec![0, 1], vec![0.0; 2], 1, 2).unwrap();
        assert!(mean_recall(&[result(&[0]), result(&[1])], &gt, 1).is_err());
        assert!(mean_recall(&[result(&[0, 1, 2])], &gt, 3).is_err());
    }
}
