//! Population Stability Index

use crate::error::{Result, ScoringError};
use crate::utils::{count_distinct, quantile_linear, right_closed_bin, sorted};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default floor applied to bin shares before the log term
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Stability class of a PSI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityClass {
    Stable,
    Moderate,
    Severe,
}

impl StabilityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StabilityClass::Stable => "stable",
            StabilityClass::Moderate => "moderate",
            StabilityClass::Severe => "severe",
        }
    }
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PSI classification thresholds.
///
/// `psi < moderate` is stable, `moderate <= psi <= severe` is a moderate
/// shift and `psi > severe` a severe one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsiThresholds {
    pub moderate: f64,
    pub severe: f64,
}

impl Default for PsiThresholds {
    fn default() -> Self {
        Self {
            moderate: 0.10,
            severe: 0.25,
        }
    }
}

impl PsiThresholds {
    pub fn new(moderate: f64, severe: f64) -> Result<Self> {
        let thresholds = Self { moderate, severe };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.moderate.is_finite() || self.moderate < 0.0 {
            return Err(ScoringError::invalid_parameter(
                "moderate",
                self.moderate,
                "must be finite and non-negative",
            ));
        }
        if !self.severe.is_finite() || self.severe < self.moderate {
            return Err(ScoringError::invalid_parameter(
                "severe",
                self.severe,
                "must be finite and at least the moderate threshold",
            ));
        }
        Ok(())
    }

    pub fn classify(&self, psi: f64) -> StabilityClass {
        if psi < self.moderate {
            StabilityClass::Stable
        } else if psi <= self.severe {
            StabilityClass::Moderate
        } else {
            StabilityClass::Severe
        }
    }
}

/// Where bin boundaries come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinBoundaries {
    /// Quantile cut points of the reference sample
    ReferenceQuantiles { n_bins: usize },
    /// Fixed, strictly increasing interior cut points
    Explicit(Vec<f64>),
}

impl Default for BinBoundaries {
    fn default() -> Self {
        BinBoundaries::ReferenceQuantiles { n_bins: 10 }
    }
}

/// PSI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PsiConfig {
    pub boundaries: BinBoundaries,
    /// Floor for zero shares; small values make sparse bins dominate
    pub epsilon: f64,
    pub thresholds: PsiThresholds,
}

impl Default for PsiConfig {
    fn default() -> Self {
        Self {
            boundaries: BinBoundaries::default(),
            epsilon: DEFAULT_EPSILON,
            thresholds: PsiThresholds::default(),
        }
    }
}

impl PsiConfig {
    pub fn with_bins(mut self, n_bins: usize) -> Self {
        self.boundaries = BinBoundaries::ReferenceQuantiles { n_bins };
        self
    }

    pub fn with_boundaries(mut self, cuts: Vec<f64>) -> Self {
        self.boundaries = BinBoundaries::Explicit(cuts);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_thresholds(mut self, thresholds: PsiThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epsilon.is_nan() || self.epsilon <= 0.0 || self.epsilon >= 1.0 {
            return Err(ScoringError::invalid_parameter(
                "epsilon",
                self.epsilon,
                "must be in (0, 1)",
            ));
        }
        match &self.boundaries {
            BinBoundaries::ReferenceQuantiles { n_bins } if *n_bins < 2 => {
                return Err(ScoringError::invalid_parameter(
                    "n_bins",
                    n_bins,
                    "must be at least 2",
                ));
            }
            BinBoundaries::Explicit(cuts) => {
                if cuts.is_empty() {
                    return Err(ScoringError::invalid_parameter(
                        "boundaries",
                        "[]",
                        "need at least one cut point",
                    ));
                }
                if cuts.iter().any(|c| !c.is_finite()) || cuts.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(ScoringError::invalid_parameter(
                        "boundaries",
                        format!("{:?}", cuts),
                        "must be finite and strictly increasing",
                    ));
                }
            }
            _ => {}
        }
        self.thresholds.validate()
    }
}

/// One PSI bin, `(lower, upper]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiBin {
    pub lower: f64,
    pub upper: f64,
    pub reference_count: usize,
    pub current_count: usize,
    pub reference_share: f64,
    pub current_share: f64,
    /// `(cur - ref) * ln(cur / ref)` on floored shares
    pub contribution: f64,
}

/// PSI of one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiRecord {
    pub feature: String,
    /// Interior cut points; the outer bins are open-ended
    pub boundaries: Vec<f64>,
    pub bins: Vec<PsiBin>,
    pub psi: f64,
    pub stability: StabilityClass,
    pub epsilon: f64,
    pub reference_size: usize,
    pub current_size: usize,
    /// Missing (NaN) values dropped before binning
    pub reference_missing: usize,
    pub current_missing: usize,
}

impl PsiRecord {
    pub fn reference_shares(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.reference_share).collect()
    }

    pub fn current_shares(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.current_share).collect()
    }
}

/// PSI calculator.
///
/// Bins are right-closed, `(e[k-1], e[k]]`, with open outer bins so current
/// values outside the reference range land in the tails instead of being
/// dropped. Classification only labels the result; the calculator never
/// decides what to do with an unstable feature.
#[derive(Debug, Clone, Default)]
pub struct PopulationStabilityIndex {
    config: PsiConfig,
}

impl PopulationStabilityIndex {
    pub fn new(config: PsiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PsiConfig {
        &self.config
    }

    /// PSI of one feature between two samples
    pub fn compute(&self, feature: &str, reference: &Array1<f64>, current: &Array1<f64>) -> Result<PsiRecord> {
        let reference: Vec<f64> = reference.iter().copied().collect();
        let current: Vec<f64> = current.iter().copied().collect();
        self.compute_slices(feature, &reference, &current)
    }

    /// PSI of one feature between two slices; NaN marks a missing value
    pub fn compute_slices(&self, feature: &str, reference: &[f64], current: &[f64]) -> Result<PsiRecord> {
        let (reference, reference_missing) = present_values(reference);
        let (current, current_missing) = present_values(current);
        if reference.is_empty() || current.is_empty() {
            return Err(ScoringError::InvalidInput(format!(
                "feature '{}': reference and current samples need at least one non-missing value",
                feature
            )));
        }
        if let Some(v) = reference.iter().chain(&current).find(|v| v.is_infinite()) {
            return Err(ScoringError::InvalidInput(format!(
                "feature '{}': infinite value {}",
                feature, v
            )));
        }

        let cuts = self.boundaries(&reference)?;
        let reference_counts = bin_counts(&cuts, &reference);
        let current_counts = bin_counts(&cuts, &current);

        let eps = self.config.epsilon;
        let mut psi = 0.0;
        let bins: Vec<PsiBin> = (0..=cuts.len())
            .map(|k| {
                let reference_share = reference_counts[k] as f64 / reference.len() as f64;
                let current_share = current_counts[k] as f64 / current.len() as f64;
                let contribution = psi_term(reference_share, current_share, eps);
                psi += contribution;
                PsiBin {
                    lower: if k == 0 { f64::NEG_INFINITY } else { cuts[k - 1] },
                    upper: if k == cuts.len() { f64::INFINITY } else { cuts[k] },
                    reference_count: reference_counts[k],
                    current_count: current_counts[k],
                    reference_share,
                    current_share,
                    contribution,
                }
            })
            .collect();

        Ok(PsiRecord {
            feature: feature.to_string(),
            boundaries: cuts,
            bins,
            psi,
            stability: self.config.thresholds.classify(psi),
            epsilon: eps,
            reference_size: reference.len(),
            current_size: current.len(),
            reference_missing,
            current_missing,
        })
    }

    /// Interior cut points for a reference sample without missing values.
    ///
    /// With quantile boundaries, the `k / n_bins` quantiles for
    /// `k = 1..n_bins` are de-duplicated and any equal to the reference
    /// maximum dropped. When that leaves nothing but the sample still varies,
    /// the reference minimum is the single cut point. A constant reference is
    /// [`ScoringError::InsufficientVariation`].
    pub fn boundaries(&self, reference: &[f64]) -> Result<Vec<f64>> {
        let n_bins = match &self.config.boundaries {
            BinBoundaries::Explicit(cuts) => return Ok(cuts.clone()),
            BinBoundaries::ReferenceQuantiles { n_bins } => *n_bins,
        };

        let sorted = sorted(reference);
        let distinct = count_distinct(&sorted);
        if distinct < 2 {
            return Err(ScoringError::InsufficientVariation {
                requested: n_bins,
                distinct,
            });
        }
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        let mut cuts: Vec<f64> = (1..n_bins)
            .filter_map(|k| quantile_linear(&sorted, k as f64 / n_bins as f64))
            .filter(|&q| q < max)
            .collect();
        cuts.dedup();
        if cuts.is_empty() {
            cuts.push(min);
        }
        Ok(cuts)
    }
}

fn present_values(values: &[f64]) -> (Vec<f64>, usize) {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let missing = values.len() - present.len();
    (present, missing)
}

fn bin_counts(cuts: &[f64], values: &[f64]) -> Vec<usize> {
    let mut counts = vec![0usize; cuts.len() + 1];
    for &v in values {
        counts[right_closed_bin(cuts, v)] += 1;
    }
    counts
}

fn psi_term(reference_share: f64, current_share: f64, epsilon: f64) -> f64 {
    let r = reference_share.max(epsilon);
    let c = current_share.max(epsilon);
    (c - r) * (c / r).ln()
}

/// PSI between two share vectors over the same bins.
///
/// Shares below `epsilon` are floored to `epsilon` before the log term.
pub fn psi_from_shares(reference: &[f64], current: &[f64], epsilon: f64) -> Result<f64> {
    if reference.is_empty() || reference.len() != current.len() {
        return Err(ScoringError::InvalidInput(format!(
            "share vectors must be non-empty and aligned ({} vs {})",
            reference.len(),
            current.len()
        )));
    }
    if epsilon.is_nan() || epsilon <= 0.0 {
        return Err(ScoringError::invalid_parameter("epsilon", epsilon, "must be positive"));
    }
    if let Some(s) = reference.iter().chain(current).find(|s| !(0.0..=1.0).contains(*s)) {
        return Err(ScoringError::InvalidInput(format!("share {} outside [0, 1]", s)));
    }
    Ok(reference
        .iter()
        .zip(current)
        .map(|(&r, &c)| psi_term(r, c, epsilon))
        .sum())
}
