//! Rank-metric engine
//!
//! Computes the ROC curve, AUC, KS statistic and Gini coefficient of a
//! scored sample, plus threshold-based classification metrics:
//! - [`RocCurve`] over every distinct score threshold
//! - [`KsResult`] with the threshold where separation peaks
//! - [`PerformanceSummary`] with confusion matrix, precision, recall and F1
//!
//! Both classes must be present; otherwise every metric is undefined and
//! the engine returns [`ScoringError::InvalidInput`].

mod ks;
mod roc;
mod threshold;

pub use ks::KsResult;
pub use roc::{RocCurve, RocPoint};
pub use threshold::{ConfusionMatrix, PerformanceSummary, DEFAULT_THRESHOLD};

use crate::error::{Result, ScoringError};
use crate::sample::{check_aligned, class_counts, parse_labels, ScoredSample};
use serde::{Deserialize, Serialize};

/// ROC curve, AUC, KS and Gini of one scored sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankMetrics {
    pub roc: RocCurve,
    pub auc: f64,
    pub ks: KsResult,
    /// `2 * auc - 1`
    pub gini: f64,
    pub n_records: usize,
    pub positives: usize,
}

impl RankMetrics {
    /// Compute from numeric labels (`0`/`1`) and scores
    pub fn compute(labels: &[f64], scores: &[f64]) -> Result<Self> {
        check_aligned(labels.len(), scores)?;
        let labels = parse_labels(labels)?;
        Self::from_binary(&labels, scores)
    }

    /// Compute from binary labels and scores
    pub fn from_binary(labels: &[bool], scores: &[f64]) -> Result<Self> {
        check_aligned(labels.len(), scores)?;
        let (positives, negatives) = class_counts(labels);
        if positives == 0 {
            return Err(ScoringError::InvalidInput(
                "no positive samples: AUC/KS undefined".to_string(),
            ));
        }
        if negatives == 0 {
            return Err(ScoringError::InvalidInput(
                "no negative samples: AUC/KS undefined".to_string(),
            ));
        }

        let roc = RocCurve::build(labels, scores, positives, negatives);
        let auc = roc.auc();
        let ks = KsResult::from_curve(&roc);

        Ok(Self {
            roc,
            auc,
            ks,
            gini: 2.0 * auc - 1.0,
            n_records: labels.len(),
            positives,
        })
    }

    /// Compute over a whole sample, ignoring cohort tags
    pub fn from_sample(sample: &ScoredSample) -> Result<Self> {
        Self::from_binary(sample.labels(), sample.scores())
    }
}

/// Metrics of one cohort; a cohort without both classes carries its error
#[derive(Debug)]
pub struct CohortMetrics {
    pub cohort: String,
    pub n_records: usize,
    pub metrics: Result<PerformanceSummary>,
    pub rank: Option<RankMetrics>,
}

/// Rank and threshold metrics for each cohort of the sample, in cohort order.
///
/// A failing cohort does not prevent the others from being evaluated.
pub fn evaluate_cohorts(sample: &ScoredSample, threshold: f64) -> Vec<CohortMetrics> {
    sample
        .cohort_groups()
        .into_iter()
        .map(|(cohort, indices)| {
            let (labels, scores) = sample.select(&indices);
            let rank = RankMetrics::from_binary(&labels, &scores);
            let (metrics, rank) = match rank {
                Ok(rank) if threshold.is_finite() => (
                    Ok(PerformanceSummary::from_rank(&rank, &labels, &scores, threshold)),
                    Some(rank),
                ),
                Ok(_) => (
                    Err(ScoringError::invalid_parameter("threshold", threshold, "must be finite")),
                    None,
                ),
                Err(err) => (Err(err), None),
            };
            CohortMetrics {
                cohort,
                n_records: indices.len(),
                metrics,
                rank,
            }
        })
        .collect()
}
