//! Evaluation configuration
//!
//! Groups the per-analyzer configs so a whole evaluation run can be described
//! in one JSON file. Missing sections fall back to their defaults.

use crate::calibration::CalibrationConfig;
use crate::drift::PsiConfig;
use crate::error::{Result, ScoringError};
use crate::lift::LiftConfig;
use crate::ranking::DEFAULT_THRESHOLD;
use crate::temporal::TemporalConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub lift: LiftConfig,
    pub calibration: CalibrationConfig,
    pub psi: PsiConfig,
    pub temporal: TemporalConfig,
    /// Decision threshold for the confusion matrix
    pub classification_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            lift: LiftConfig::default(),
            calibration: CalibrationConfig::default(),
            psi: PsiConfig::default(),
            temporal: TemporalConfig::default(),
            classification_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EvaluationConfig {
    pub fn with_lift(mut self, lift: LiftConfig) -> Self {
        self.lift = lift;
        self
    }

    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_psi(mut self, psi: PsiConfig) -> Self {
        self.psi = psi;
        self
    }

    pub fn with_temporal(mut self, temporal: TemporalConfig) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_classification_threshold(mut self, threshold: f64) -> Self {
        self.classification_threshold = threshold;
        self
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ScoringError::SerializationError(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.lift.validate()?;
        self.calibration.validate()?;
        self.psi.validate()?;
        self.temporal.validate()?;
        if !self.classification_threshold.is_finite() {
            return Err(ScoringError::invalid_parameter(
                "classification_threshold",
                self.classification_threshold,
                "must be finite",
            ));
        }
        Ok(())
    }
}
