//! Kolosal Scoring - evaluation toolkit for binary credit-scoring models
//!
//! Given labels and scores from an already-trained model, this crate
//! measures how well the model ranks, how well it is calibrated and how
//! stable its inputs and performance are over time.
//!
//! # Modules
//!
//! ## Evaluation
//! - [`ranking`] - ROC curve, AUC, KS, Gini and threshold metrics
//! - [`lift`] - Quantile (decile) lift tables per cohort
//! - [`calibration`] - Calibration curves, Brier score, ECE/MCE
//! - [`drift`] - Population Stability Index per feature
//! - [`temporal`] - KS/AUC per origination period (safra)
//!
//! ## Infrastructure
//! - [`sample`] - Scored-sample input and tabular ingestion
//! - [`config`] - Evaluation configuration
//! - [`export`] - DataFrame, CSV and JSON export of results
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Input
pub mod sample;

// Evaluation modules
pub mod ranking;
pub mod lift;
pub mod calibration;
pub mod drift;
pub mod temporal;

// Infrastructure
pub mod config;
pub mod export;
pub mod cli;
pub mod utils;

pub use error::{Result, ScoringError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Result, ScoringError};

    // Input
    pub use crate::sample::{ColumnMapping, ScoredSample};

    // Rank metrics
    pub use crate::ranking::{
        evaluate_cohorts, CohortMetrics, ConfusionMatrix, KsResult, PerformanceSummary, RankMetrics, RocCurve,
    };

    // Lift
    pub use crate::lift::{CohortLift, LiftConfig, QuantileBucket, QuantileLiftAnalyzer, VariationPolicy};

    // Calibration
    pub use crate::calibration::{BinningStrategy, CalibrationBinner, CalibrationConfig, CalibrationCurve};

    // Population stability
    pub use crate::drift::{
        psi_for_frames, PopulationStabilityIndex, PsiConfig, PsiRecord, PsiTable, PsiThresholds, StabilityClass,
    };

    // Temporal stability
    pub use crate::temporal::{TemporalConfig, TemporalReport, TemporalStabilityDriver};

    // Config and export
    pub use crate::config::EvaluationConfig;
    pub use crate::export::{write_csv, write_json, ToFrame};
}
