//! Calibration metrics

use crate::calibration::binner::CalibrationBin;
use crate::error::Result;
use crate::sample::check_aligned;

/// Compute Brier Score
///
/// Brier = (1/n) * sum_i (p_i - y_i)^2
pub fn brier_score(labels: &[bool], probs: &[f64]) -> Result<f64> {
    check_aligned(labels.len(), probs)?;

    let score: f64 = probs
        .iter()
        .zip(labels)
        .map(|(&p, &y)| (p - if y { 1.0 } else { 0.0 }).powi(2))
        .sum();

    Ok(score / probs.len() as f64)
}

/// Expected Calibration Error over populated bins
///
/// ECE = sum_i (|B_i| / n) * |rate(B_i) - conf(B_i)|
pub fn expected_calibration_error(bins: &[CalibrationBin]) -> f64 {
    let n: usize = bins.iter().map(|b| b.count).sum();
    if n == 0 {
        return 0.0;
    }
    bins.iter()
        .filter_map(|b| b.gap().map(|gap| (b.count as f64 / n as f64) * gap.abs()))
        .sum()
}

/// Maximum Calibration Error over populated bins
///
/// MCE = max_i |rate(B_i) - conf(B_i)|
pub fn maximum_calibration_error(bins: &[CalibrationBin]) -> f64 {
    bins.iter()
        .filter_map(|b| b.gap())
        .map(f64::abs)
        .fold(0.0, f64::max)
}
