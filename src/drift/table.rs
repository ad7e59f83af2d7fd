//! PSI over many features

use crate::drift::psi::{PopulationStabilityIndex, PsiRecord, StabilityClass};
use crate::error::{Result, ScoringError};
use crate::sample::numeric_column;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A feature whose PSI could not be computed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiFailure {
    pub feature: String,
    pub error: String,
}

/// PSI records for a set of features, highest PSI first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsiTable {
    pub records: Vec<PsiRecord>,
    pub failures: Vec<PsiFailure>,
    pub generated_at: DateTime<Utc>,
}

impl PsiTable {
    fn assemble(results: Vec<(String, Result<PsiRecord>)>) -> Self {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (feature, result) in results {
            match result {
                Ok(record) => {
                    tracing::debug!(feature = %feature, psi = record.psi, stability = %record.stability, "PSI computed");
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(feature = %feature, error = %e, "PSI not computed");
                    failures.push(PsiFailure {
                        feature,
                        error: e.to_string(),
                    });
                }
            }
        }

        records.sort_by(|a, b| b.psi.total_cmp(&a.psi).then_with(|| a.feature.cmp(&b.feature)));
        failures.sort_by(|a, b| a.feature.cmp(&b.feature));

        tracing::info!(
            features = records.len(),
            failed = failures.len(),
            severe = records.iter().filter(|r| r.stability == StabilityClass::Severe).count(),
            "PSI table built"
        );

        Self {
            records,
            failures,
            generated_at: Utc::now(),
        }
    }

    /// Features classified at `class` or worse
    pub fn at_least(&self, class: StabilityClass) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.stability >= class)
            .map(|r| r.feature.as_str())
            .collect()
    }

    pub fn get(&self, feature: &str) -> Option<&PsiRecord> {
        self.records.iter().find(|r| r.feature == feature)
    }

    /// Generate summary string
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("PSI Report\n");
        s.push_str("==========\n");
        s.push_str(&format!("Features evaluated: {}\n", self.records.len()));
        s.push_str(&format!("Features failed: {}\n", self.failures.len()));
        s.push_str(&format!(
            "Moderate shift: {}\n",
            self.records.iter().filter(|r| r.stability == StabilityClass::Moderate).count()
        ));
        s.push_str(&format!(
            "Severe shift: {}\n\n",
            self.records.iter().filter(|r| r.stability == StabilityClass::Severe).count()
        ));

        for r in self.records.iter().filter(|r| r.stability != StabilityClass::Stable) {
            s.push_str(&format!("  - {} [{}] psi={:.4}\n", r.feature, r.stability.as_str().to_uppercase(), r.psi));
        }
        for f in &self.failures {
            s.push_str(&format!("  - {} [FAILED] {}\n", f.feature, f.error));
        }
        s
    }
}

/// PSI of each named column between two tables.
///
/// A column missing from either table fails the whole call; a feature whose
/// PSI is undefined (e.g. constant in the reference) is listed in
/// [`PsiTable::failures`].
pub fn psi_for_frames(
    calculator: &PopulationStabilityIndex,
    reference: &DataFrame,
    current: &DataFrame,
    features: &[String],
) -> Result<PsiTable> {
    let columns: Vec<(String, Vec<f64>, Vec<f64>)> = features
        .iter()
        .map(|feature| {
            let reference_values = nan_for_null(numeric_column(reference, feature)?);
            let current_values = nan_for_null(numeric_column(current, feature)?);
            Ok((feature.clone(), reference_values, current_values))
        })
        .collect::<Result<_>>()?;

    let results: Vec<(String, Result<PsiRecord>)> = columns
        .par_iter()
        .map(|(feature, reference, current)| {
            (feature.clone(), calculator.compute_slices(feature, reference, current))
        })
        .collect();

    Ok(PsiTable::assemble(results))
}

/// PSI of each column of two feature matrices
pub fn psi_for_matrices(
    calculator: &PopulationStabilityIndex,
    reference: &Array2<f64>,
    current: &Array2<f64>,
    feature_names: &[String],
) -> Result<PsiTable> {
    if reference.ncols() != feature_names.len() || current.ncols() != feature_names.len() {
        return Err(ScoringError::InvalidInput(format!(
            "Expected {} features, got {} (reference) and {} (current)",
            feature_names.len(),
            reference.ncols(),
            current.ncols()
        )));
    }

    let results: Vec<(String, Result<PsiRecord>)> = feature_names
        .par_iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let reference_col = reference.column(col_idx).to_owned();
            let current_col = current.column(col_idx).to_owned();
            (name.clone(), calculator.compute(name, &reference_col, &current_col))
        })
        .collect();

    Ok(PsiTable::assemble(results))
}

fn nan_for_null(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}
