//! Calibration binning

use crate::calibration::metrics::{brier_score, expected_calibration_error, maximum_calibration_error};
use crate::error::{Result, ScoringError};
use crate::sample::check_aligned;
use crate::utils::{quantile_linear, right_closed_bin, sorted};
use serde::{Deserialize, Serialize};

/// How probability bins are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinningStrategy {
    /// Equal-width bins over [0, 1]
    #[default]
    FixedWidth,
    /// Bin edges at quantiles of the predicted probabilities
    Quantile,
}

impl std::str::FromStr for BinningStrategy {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" | "fixed_width" | "uniform" => Ok(BinningStrategy::FixedWidth),
            "quantile" => Ok(BinningStrategy::Quantile),
            _ => Err(ScoringError::invalid_parameter(
                "strategy",
                s,
                "expected 'fixed_width' or 'quantile'",
            )),
        }
    }
}

/// Calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub n_bins: usize,
    pub strategy: BinningStrategy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            n_bins: 10,
            strategy: BinningStrategy::FixedWidth,
        }
    }
}

impl CalibrationConfig {
    pub fn new(n_bins: usize, strategy: BinningStrategy) -> Self {
        Self { n_bins, strategy }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_bins == 0 {
            return Err(ScoringError::invalid_parameter(
                "n_bins",
                self.n_bins,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// What a bin observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BinContents {
    /// No record fell in the bin
    Empty,
    Observed {
        mean_predicted: f64,
        observed_rate: f64,
    },
}

/// One calibration bin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationBin {
    /// 1-based, 1 = lowest probabilities
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub contents: BinContents,
}

impl CalibrationBin {
    pub fn is_empty(&self) -> bool {
        matches!(self.contents, BinContents::Empty)
    }

    pub fn mean_predicted(&self) -> Option<f64> {
        match self.contents {
            BinContents::Observed { mean_predicted, .. } => Some(mean_predicted),
            BinContents::Empty => None,
        }
    }

    pub fn observed_rate(&self) -> Option<f64> {
        match self.contents {
            BinContents::Observed { observed_rate, .. } => Some(observed_rate),
            BinContents::Empty => None,
        }
    }

    /// Observed rate minus mean prediction; positive means underestimation
    pub fn gap(&self) -> Option<f64> {
        match self.contents {
            BinContents::Observed {
                mean_predicted,
                observed_rate,
            } => Some(observed_rate - mean_predicted),
            BinContents::Empty => None,
        }
    }
}

/// Calibration curve with summary errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub strategy: BinningStrategy,
    pub bins: Vec<CalibrationBin>,
    pub n_records: usize,
    pub brier_score: f64,
    pub expected_calibration_error: f64,
    pub maximum_calibration_error: f64,
}

impl CalibrationCurve {
    pub fn empty_bins(&self) -> usize {
        self.bins.iter().filter(|b| b.is_empty()).count()
    }
}

/// Calibration binner
#[derive(Debug, Clone, Default)]
pub struct CalibrationBinner {
    config: CalibrationConfig,
}

impl CalibrationBinner {
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Bin the predicted probabilities and compare each bin's mean
    /// prediction with its observed event rate.
    ///
    /// Fixed-width bins are `[k/n, (k+1)/n)` with 1.0 in the last bin; a
    /// probability is placed against the same edges the bin reports.
    /// Quantile bins are right-closed `(e[k-1], e[k]]` between quantile
    /// edges; tied probabilities can leave a bin empty, and it is reported
    /// as [`BinContents::Empty`].
    pub fn bin(&self, labels: &[bool], probs: &[f64]) -> Result<CalibrationCurve> {
        check_aligned(labels.len(), probs)?;
        if let Some(i) = probs.iter().position(|p| !(0.0..=1.0).contains(p)) {
            return Err(ScoringError::InvalidInput(format!(
                "probability at position {} is outside [0, 1] ({})",
                i, probs[i]
            )));
        }

        let n_bins = self.config.n_bins;
        let edges = match self.config.strategy {
            BinningStrategy::FixedWidth => (0..=n_bins).map(|k| k as f64 / n_bins as f64).collect(),
            BinningStrategy::Quantile => quantile_edges(probs, n_bins),
        };

        let mut sums = vec![0.0; n_bins];
        let mut events = vec![0usize; n_bins];
        let mut counts = vec![0usize; n_bins];

        for (&p, &y) in probs.iter().zip(labels) {
            let b = match self.config.strategy {
                BinningStrategy::FixedWidth => edges.partition_point(|&e| e <= p).saturating_sub(1).min(n_bins - 1),
                BinningStrategy::Quantile => right_closed_bin(&edges[1..n_bins], p),
            };
            sums[b] += p;
            counts[b] += 1;
            if y {
                events[b] += 1;
            }
        }

        let bins: Vec<CalibrationBin> = (0..n_bins)
            .map(|b| {
                let contents = if counts[b] == 0 {
                    BinContents::Empty
                } else {
                    BinContents::Observed {
                        mean_predicted: sums[b] / counts[b] as f64,
                        observed_rate: events[b] as f64 / counts[b] as f64,
                    }
                };
                CalibrationBin {
                    index: b + 1,
                    lower: edges[b],
                    upper: edges[b + 1],
                    count: counts[b],
                    contents,
                }
            })
            .collect();

        Ok(CalibrationCurve {
            strategy: self.config.strategy,
            n_records: probs.len(),
            brier_score: brier_score(labels, probs)?,
            expected_calibration_error: expected_calibration_error(&bins),
            maximum_calibration_error: maximum_calibration_error(&bins),
            bins,
        })
    }
}

/// `n_bins + 1` edges at the `k / n_bins` quantiles of `probs`
fn quantile_edges(probs: &[f64], n_bins: usize) -> Vec<f64> {
    let sorted = sorted(probs);
    (0..=n_bins)
        .filter_map(|k| quantile_linear(&sorted, k as f64 / n_bins as f64))
        .collect()
}
