//! Kolmogorov-Smirnov separation between events and non-events

use crate::ranking::roc::RocCurve;
use serde::{Deserialize, Serialize};

/// KS statistic and where it peaks.
///
/// At `threshold`, records with `score >= threshold` are flagged;
/// `cumulative_bad_rate` is the share of events flagged and
/// `cumulative_good_rate` the share of non-events flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub threshold: f64,
    pub cumulative_good_rate: f64,
    pub cumulative_bad_rate: f64,
}

impl KsResult {
    /// Maximum `|tpr - fpr|` over the real score thresholds of the curve.
    ///
    /// The highest threshold wins when several reach the maximum.
    pub fn from_curve(curve: &RocCurve) -> Self {
        let p = curve.positives as u128;
        let n = curve.negatives as u128;

        let mut best = curve.score_points()[0];
        let mut best_gap = 0u128;
        for point in curve.score_points() {
            let bad = point.true_positives as u128 * n;
            let good = point.false_positives as u128 * p;
            let gap = bad.abs_diff(good);
            if gap > best_gap {
                best_gap = gap;
                best = *point;
            }
        }

        Self {
            statistic: best_gap as f64 / (p * n) as f64,
            threshold: best.threshold,
            cumulative_good_rate: best.fpr,
            cumulative_bad_rate: best.tpr,
        }
    }
}
