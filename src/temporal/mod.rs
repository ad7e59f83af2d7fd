//! Temporal stability
//!
//! Re-runs the rank-metric engine once per safra (origination period) and
//! returns the KS/AUC series in chronological order. A safra where KS is not
//! meaningful stays in the series as a skipped entry with its reason, so a
//! report can show the gap.

use crate::error::{Result, ScoringError};
use crate::ranking::RankMetrics;
use crate::sample::{class_counts, ScoredSample};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporal driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Safras with fewer records are skipped
    pub min_records: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self { min_records: 2 }
    }
}

impl TemporalConfig {
    pub fn with_min_records(mut self, min_records: usize) -> Self {
        self.min_records = min_records;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_records < 2 {
            return Err(ScoringError::invalid_parameter(
                "min_records",
                self.min_records,
                "must be at least 2 (one event and one non-event)",
            ));
        }
        Ok(())
    }
}

/// Why a safra was not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    TooFewRecords { count: usize, minimum: usize },
    MissingClass { positives: usize, negatives: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewRecords { count, minimum } => {
                write!(f, "{} records, at least {} required", count, minimum)
            }
            SkipReason::MissingClass { positives, negatives } => write!(
                f,
                "{} events and {} non-events, both classes required",
                positives, negatives
            ),
        }
    }
}

impl SkipReason {
    pub fn to_error(&self, safra: &str) -> ScoringError {
        ScoringError::DegenerateCohort {
            cohort: safra.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Result of one safra
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SafraOutcome {
    Evaluated {
        ks: f64,
        auc: f64,
        gini: f64,
        ks_threshold: f64,
    },
    Skipped { reason: SkipReason },
}

/// One point of the temporal series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafraEntry {
    pub safra: String,
    pub n_records: usize,
    pub positives: usize,
    pub outcome: SafraOutcome,
}

impl SafraEntry {
    pub fn ks(&self) -> Option<f64> {
        match self.outcome {
            SafraOutcome::Evaluated { ks, .. } => Some(ks),
            SafraOutcome::Skipped { .. } => None,
        }
    }

    pub fn auc(&self) -> Option<f64> {
        match self.outcome {
            SafraOutcome::Evaluated { auc, .. } => Some(auc),
            SafraOutcome::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self.outcome {
            SafraOutcome::Skipped { reason } => Some(reason),
            SafraOutcome::Evaluated { .. } => None,
        }
    }
}

/// KS/AUC per safra, chronological
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalReport {
    pub entries: Vec<SafraEntry>,
}

impl TemporalReport {
    pub fn evaluated(&self) -> impl Iterator<Item = &SafraEntry> {
        self.entries.iter().filter(|e| e.ks().is_some())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SafraEntry> {
        self.entries.iter().filter(|e| e.ks().is_none())
    }

    /// `(safra, ks)` with `None` for skipped safras
    pub fn ks_series(&self) -> Vec<(&str, Option<f64>)> {
        self.entries.iter().map(|e| (e.safra.as_str(), e.ks())).collect()
    }

    /// KS range over evaluated safras
    pub fn ks_range(&self) -> Option<(f64, f64)> {
        self.evaluated().filter_map(|e| e.ks()).fold(None, |acc, ks| match acc {
            None => Some((ks, ks)),
            Some((lo, hi)) => Some((lo.min(ks), hi.max(ks))),
        })
    }
}

/// Per-safra rank-metric driver
#[derive(Debug, Clone, Default)]
pub struct TemporalStabilityDriver {
    config: TemporalConfig,
}

impl TemporalStabilityDriver {
    pub fn new(config: TemporalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    /// Evaluate every safra, annotating the ones that cannot be evaluated
    pub fn run(&self, sample: &ScoredSample) -> Result<TemporalReport> {
        let entries = sample
            .safra_groups()?
            .into_iter()
            .map(|(safra, indices)| {
                let (labels, scores) = sample.select(&indices);
                self.evaluate_safra(safra, &labels, &scores)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TemporalReport { entries })
    }

    /// Like [`run`](Self::run), but the first degenerate safra is returned
    /// as [`ScoringError::DegenerateCohort`]
    pub fn run_strict(&self, sample: &ScoredSample) -> Result<TemporalReport> {
        let report = self.run(sample)?;
        if let Some(entry) = report.skipped().next() {
            if let Some(reason) = entry.skip_reason() {
                return Err(reason.to_error(&entry.safra));
            }
        }
        Ok(report)
    }

    fn evaluate_safra(&self, safra: String, labels: &[bool], scores: &[f64]) -> Result<SafraEntry> {
        let (positives, negatives) = class_counts(labels);
        let n_records = labels.len();

        let skip = if n_records < self.config.min_records {
            Some(SkipReason::TooFewRecords {
                count: n_records,
                minimum: self.config.min_records,
            })
        } else if positives == 0 || negatives == 0 {
            Some(SkipReason::MissingClass { positives, negatives })
        } else {
            None
        };

        let outcome = match skip {
            Some(reason) => SafraOutcome::Skipped { reason },
            None => {
                let metrics = RankMetrics::from_binary(labels, scores)?;
                SafraOutcome::Evaluated {
                    ks: metrics.ks.statistic,
                    auc: metrics.auc,
                    gini: metrics.gini,
                    ks_threshold: metrics.ks.threshold,
                }
            }
        };

        Ok(SafraEntry {
            safra,
            n_records,
            positives,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScoredSample {
        let labels = vec![
            true, false, true, false, // 202301: perfect
            false, false, false, // 202302: no events
            true, false, false, true, // 202303: partial
            true, // 202304: single record
        ];
        let scores = vec![0.9, 0.1, 0.8, 0.2, 0.3, 0.4, 0.5, 0.7, 0.8, 0.1, 0.6, 0.5];
        let safras = [
            "202301", "202301", "202301", "202301", "202302", "202302", "202302", "202303", "202303",
            "202303", "202303", "202304",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        ScoredSample::new(labels, scores).unwrap().with_safras(safras).unwrap()
    }

    #[test]
    fn test_series_is_chronological_with_gaps() {
        let report = TemporalStabilityDriver::default().run(&sample()).unwrap();
        let series = report.ks_series();

        assert_eq!(series.len(), 4);
        assert_eq!(series[0], ("202301", Some(1.0)));
        assert_eq!(series[1], ("202302", None));
        assert!(series[2].1.is_some());
        assert_eq!(series[3], ("202304", None));
    }

    #[test]
    fn test_skip_reasons() {
        let report = TemporalStabilityDriver::default().run(&sample()).unwrap();
        let skipped: Vec<&SafraEntry> = report.skipped().collect();

        assert_eq!(skipped.len(), 2);
        assert_eq!(
            skipped[0].skip_reason(),
            Some(SkipReason::MissingClass { positives: 0, negatives: 3 })
        );
        assert_eq!(
            skipped[1].skip_reason(),
            Some(SkipReason::TooFewRecords { count: 1, minimum: 2 })
        );
    }

    #[test]
    fn test_partial_safra_metrics() {
        let report = TemporalStabilityDriver::default().run(&sample()).unwrap();
        let entry = &report.entries[2];
        // events 0.7, 0.6 vs non-events 0.8, 0.1
        assert_eq!(entry.auc(), Some(0.5));
        assert_eq!(entry.n_records, 4);
        assert_eq!(entry.positives, 2);
    }

    #[test]
    fn test_strict_mode_returns_degenerate_cohort() {
        let err = TemporalStabilityDriver::default().run_strict(&sample()).unwrap_err();
        match err {
            ScoringError::DegenerateCohort { cohort, .. } => assert_eq!(cohort, "202302"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_requires_safra_tags() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0], &[0.2, 0.8]).unwrap();
        assert!(TemporalStabilityDriver::default().run(&sample).is_err());
    }

    #[test]
    fn test_min_records_threshold() {
        let driver = TemporalStabilityDriver::new(TemporalConfig::default().with_min_records(5)).unwrap();
        let report = driver.run(&sample()).unwrap();
        assert_eq!(report.evaluated().count(), 0);
        assert!(TemporalStabilityDriver::new(TemporalConfig::default().with_min_records(1)).is_err());
    }

    #[test]
    fn test_ks_range() {
        let report = TemporalStabilityDriver::default().run(&sample()).unwrap();
        let (lo, hi) = report.ks_range().unwrap();
        assert!(lo <= hi);
        assert_eq!(hi, 1.0);
    }
}
