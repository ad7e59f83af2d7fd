//! Rank and quantile helpers shared by the analyzers

use std::cmp::Ordering;

/// Indices of `values` ordered ascending.
///
/// The sort is stable, so tied values keep their original order.
pub fn ascending_order(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    indices
}

/// Indices of `values` ordered descending, ties in original order.
pub fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(Ordering::Equal));
    indices
}

/// Sorted copy of `values`
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Number of distinct values in an ascending slice
pub fn count_distinct(sorted: &[f64]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Quantile of an ascending slice with linear interpolation between
/// closest ranks (the `linear` method of numpy).
///
/// Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Zero-based bucket for rank `rank` when `n` ranked items are split into
/// `buckets` contiguous groups whose sizes differ by at most one.
pub fn rank_bucket(rank: usize, n: usize, buckets: usize) -> usize {
    ((rank * buckets) / n).min(buckets - 1)
}

/// Bin of `value` against ascending interior cut points, with right-closed
/// intervals `(e[k-1], e[k]]` and open-ended outer bins.
///
/// Returns a value in `0..=cuts.len()`.
pub fn right_closed_bin(cuts: &[f64], value: f64) -> usize {
    cuts.partition_point(|&edge| edge < value)
}
