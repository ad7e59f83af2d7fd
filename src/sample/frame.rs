//! Building samples from polars DataFrames

use crate::error::{Result, ScoringError};
use crate::sample::{parse_labels, ScoredSample};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column names of a scored table.
///
/// `label` and `score` are required; `id`, `cohort` and `safra` are read only
/// when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub label: String,
    pub score: String,
    pub id: Option<String>,
    pub cohort: Option<String>,
    pub safra: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            label: "label".to_string(),
            score: "score".to_string(),
            id: None,
            cohort: None,
            safra: None,
        }
    }
}

impl ColumnMapping {
    pub fn new(label: &str, score: &str) -> Self {
        Self {
            label: label.to_string(),
            score: score.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, column: &str) -> Self {
        self.id = Some(column.to_string());
        self
    }

    pub fn with_cohort(mut self, column: &str) -> Self {
        self.cohort = Some(column.to_string());
        self
    }

    pub fn with_safra(mut self, column: &str) -> Self {
        self.safra = Some(column.to_string());
        self
    }
}

impl ScoredSample {
    /// Build a sample from an already-scored table.
    ///
    /// Nulls in the label or score column are rejected, as are labels other
    /// than `0`/`1`.
    pub fn from_frame(df: &DataFrame, mapping: &ColumnMapping) -> Result<Self> {
        let labels = required_numeric(df, &mapping.label)?;
        let scores = required_numeric(df, &mapping.score)?;

        let mut sample = ScoredSample::new(parse_labels(&labels)?, scores)?;
        if let Some(column) = &mapping.id {
            sample = sample.with_ids(text_column(df, column)?)?;
        }
        if let Some(column) = &mapping.cohort {
            sample = sample.with_cohorts(text_column(df, column)?)?;
        }
        if let Some(column) = &mapping.safra {
            sample = sample.with_safras(text_column(df, column)?)?;
        }
        Ok(sample)
    }
}

/// Values of a numeric column cast to `f64`; nulls stay `None`
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| ScoringError::FeatureNotFound(name.to_string()))?;
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}

fn required_numeric(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    numeric_column(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                ScoringError::InvalidInput(format!("column '{}' is null at row {}", name, row))
            })
        })
        .collect()
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| ScoringError::FeatureNotFound(name.to_string()))?;
    let values = column.cast(&DataType::String)?;
    values
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(str::to_string).ok_or_else(|| {
                ScoringError::InvalidInput(format!("column '{}' is null at row {}", name, row))
            })
        })
        .collect()
}

/// Names of the numeric columns shared by both frames, in `reference` order
pub fn shared_numeric_columns(reference: &DataFrame, current: &DataFrame) -> Vec<String> {
    reference
        .get_columns()
        .iter()
        .filter(|column| column.dtype().is_numeric())
        .map(|column| column.name().to_string())
        .filter(|name| {
            current
                .column(name)
                .map(|column| column.dtype().is_numeric())
                .unwrap_or(false)
        })
        .collect()
}
