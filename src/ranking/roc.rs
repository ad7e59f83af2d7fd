//! ROC curve construction

use crate::utils::descending_order;
use serde::{Deserialize, Serialize};

/// A single point on the ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Records with `score >= threshold` are flagged positive
    pub threshold: f64,
    /// False positive rate
    pub fpr: f64,
    /// True positive rate
    pub tpr: f64,
    /// Negatives flagged at this threshold
    pub false_positives: usize,
    /// Positives flagged at this threshold
    pub true_positives: usize,
}

/// ROC curve over every distinct score threshold.
///
/// The first point has threshold `+inf` and sits at (0, 0); the last has
/// threshold `-inf` and sits at (1, 1). Both rates are non-decreasing along
/// the curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub positives: usize,
    pub negatives: usize,
}

impl RocCurve {
    /// Build the curve. Callers guarantee aligned, finite input with both
    /// classes present.
    pub(crate) fn build(labels: &[bool], scores: &[f64], positives: usize, negatives: usize) -> Self {
        let order = descending_order(scores);
        let p = positives as f64;
        let n = negatives as f64;

        let mut points = Vec::with_capacity(order.len() + 2);
        points.push(RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
            false_positives: 0,
            true_positives: 0,
        });

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut i = 0;
        while i < order.len() {
            let threshold = scores[order[i]];
            while i < order.len() && scores[order[i]] == threshold {
                if labels[order[i]] {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold,
                fpr: fp as f64 / n,
                tpr: tp as f64 / p,
                false_positives: fp,
                true_positives: tp,
            });
        }

        points.push(RocPoint {
            threshold: f64::NEG_INFINITY,
            fpr: 1.0,
            tpr: 1.0,
            false_positives: negatives,
            true_positives: positives,
        });

        Self {
            points,
            positives,
            negatives,
        }
    }

    /// Trapezoidal area under the curve.
    ///
    /// Accumulated on integer counts so that identical input always yields a
    /// bit-identical value.
    pub fn auc(&self) -> f64 {
        let doubled_area: u128 = self
            .points
            .windows(2)
            .map(|w| {
                let width = (w[1].false_positives - w[0].false_positives) as u128;
                let heights = (w[0].true_positives + w[1].true_positives) as u128;
                width * heights
            })
            .sum();

        doubled_area as f64 / (2.0 * self.positives as f64 * self.negatives as f64)
    }

    /// Points at real score thresholds, without the two infinite end points
    pub fn score_points(&self) -> &[RocPoint] {
        &self.points[1..self.points.len() - 1]
    }
}
