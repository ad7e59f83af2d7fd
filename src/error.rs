//! Error types for the Kolosal scoring toolkit

use thiserror::Error;

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Main error type for the scoring toolkit.
///
/// Undefined metrics are always reported through one of these variants,
/// never as NaN or zero.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient variation: requested {requested} bins, only {distinct} distinct values")]
    InsufficientVariation { requested: usize, distinct: usize },

    #[error("Degenerate cohort '{cohort}': {reason}")]
    DegenerateCohort { cohort: String, reason: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScoringError {
    /// Shorthand for an [`ScoringError::InvalidParameter`]
    pub fn invalid_parameter(name: &str, value: impl ToString, reason: &str) -> Self {
        ScoringError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for ScoringError {
    fn from(err: polars::error::PolarsError) -> Self {
        ScoringError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ScoringError {
    fn from(err: serde_json::Error) -> Self {
        ScoringError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScoringError {
    fn from(err: ndarray::ShapeError) -> Self {
        ScoringError::InvalidInput(format!("invalid shape: {}", err))
    }
}
