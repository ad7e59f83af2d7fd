//! Model calibration module
//!
//! Compares predicted probabilities with observed event rates:
//! - Fixed-width or quantile binning ([`BinningStrategy`])
//! - Explicit empty-bin markers ([`BinContents::Empty`])
//! - Calibration metrics (ECE, MCE, Brier score)

mod binner;
mod metrics;

pub use binner::{
    BinContents, BinningStrategy, CalibrationBin, CalibrationBinner, CalibrationConfig, CalibrationCurve,
};
pub use metrics::{brier_score, expected_calibration_error, maximum_calibration_error};
