//! Classification metrics at a fixed decision threshold

use crate::error::{Result, ScoringError};
use crate::ranking::RankMetrics;
use serde::{Deserialize, Serialize};

/// Default decision threshold
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Confusion matrix where `score >= threshold` predicts an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn at_threshold(labels: &[bool], scores: &[f64], threshold: f64) -> Self {
        let mut matrix = Self::default();
        for (&label, &score) in labels.iter().zip(scores) {
            match (label, score >= threshold) {
                (true, true) => matrix.true_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (false, true) => matrix.false_positives += 1,
                (true, false) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        (self.true_positives + self.true_negatives) as f64 / self.total() as f64
    }

    /// `None` when nothing is predicted positive
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `None` when there are no events
    pub fn recall(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// `None` when precision or recall is undefined, or both are zero
    pub fn f1(&self) -> Option<f64> {
        let p = self.precision()?;
        let r = self.recall()?;
        if p + r > 0.0 {
            Some(2.0 * p * r / (p + r))
        } else {
            None
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Ranking and threshold metrics for one scored sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub auc: f64,
    pub ks: f64,
    pub gini: f64,
    pub threshold: f64,
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl PerformanceSummary {
    pub fn compute(labels: &[bool], scores: &[f64], threshold: f64) -> Result<Self> {
        if !threshold.is_finite() {
            return Err(ScoringError::invalid_parameter(
                "threshold",
                threshold,
                "must be finite",
            ));
        }
        let rank = RankMetrics::from_binary(labels, scores)?;
        Ok(Self::from_rank(&rank, labels, scores, threshold))
    }

    pub(crate) fn from_rank(rank: &RankMetrics, labels: &[bool], scores: &[f64], threshold: f64) -> Self {
        let confusion = ConfusionMatrix::at_threshold(labels, scores, threshold);
        Self {
            auc: rank.auc,
            ks: rank.ks.statistic,
            gini: rank.gini,
            threshold,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
        }
    }
}
