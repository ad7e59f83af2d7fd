//! Scored samples
//!
//! A [`ScoredSample`] holds aligned binary labels and model scores for a set
//! of records, optionally tagged with an id, a cohort (e.g. train/test) and a
//! safra (origination period). Every analyzer consumes either a sample or the
//! raw label/score slices it is built from.

mod frame;

pub use frame::{numeric_column, shared_numeric_columns, ColumnMapping};

use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cohort name used for records that carry no cohort tag
pub const DEFAULT_COHORT: &str = "all";

/// Aligned labels and scores with optional record tags.
///
/// Deserialization goes through the same checks as [`ScoredSample::new`]
/// and the `with_*` tag setters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct ScoredSample {
    labels: Vec<bool>,
    scores: Vec<f64>,
    ids: Option<Vec<String>>,
    cohorts: Option<Vec<String>>,
    safras: Option<Vec<String>>,
}

/// Unchecked wire form of a [`ScoredSample`]
#[derive(Deserialize)]
struct RawSample {
    labels: Vec<bool>,
    scores: Vec<f64>,
    #[serde(default)]
    ids: Option<Vec<String>>,
    #[serde(default)]
    cohorts: Option<Vec<String>>,
    #[serde(default)]
    safras: Option<Vec<String>>,
}

impl TryFrom<RawSample> for ScoredSample {
    type Error = ScoringError;

    fn try_from(raw: RawSample) -> Result<Self> {
        let mut sample = ScoredSample::new(raw.labels, raw.scores)?;
        if let Some(ids) = raw.ids {
            sample = sample.with_ids(ids)?;
        }
        if let Some(cohorts) = raw.cohorts {
            sample = sample.with_cohorts(cohorts)?;
        }
        if let Some(safras) = raw.safras {
            sample = sample.with_safras(safras)?;
        }
        Ok(sample)
    }
}

impl ScoredSample {
    /// Create a sample from binary labels and scores
    pub fn new(labels: Vec<bool>, scores: Vec<f64>) -> Result<Self> {
        check_aligned(labels.len(), &scores)?;
        Ok(Self {
            labels,
            scores,
            ids: None,
            cohorts: None,
            safras: None,
        })
    }

    /// Create a sample from numeric labels (`0`/`1`) and scores
    pub fn from_raw(labels: &[f64], scores: &[f64]) -> Result<Self> {
        Self::new(parse_labels(labels)?, scores.to_vec())
    }

    /// Attach record ids
    pub fn with_ids(mut self, ids: Vec<String>) -> Result<Self> {
        self.check_tag_len("id", ids.len())?;
        self.ids = Some(ids);
        Ok(self)
    }

    /// Attach cohort tags
    pub fn with_cohorts(mut self, cohorts: Vec<String>) -> Result<Self> {
        self.check_tag_len("cohort", cohorts.len())?;
        self.cohorts = Some(cohorts);
        Ok(self)
    }

    /// Attach safra (time-bucket) tags
    pub fn with_safras(mut self, safras: Vec<String>) -> Result<Self> {
        self.check_tag_len("safra", safras.len())?;
        self.safras = Some(safras);
        Ok(self)
    }

    fn check_tag_len(&self, tag: &str, len: usize) -> Result<()> {
        if len != self.labels.len() {
            return Err(ScoringError::InvalidInput(format!(
                "{} tags length {} != sample length {}",
                tag,
                len,
                self.labels.len()
            )));
        }
        Ok(())
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn ids(&self) -> Option<&[String]> {
        self.ids.as_deref()
    }

    pub fn cohorts(&self) -> Option<&[String]> {
        self.cohorts.as_deref()
    }

    pub fn safras(&self) -> Option<&[String]> {
        self.safras.as_deref()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the sample has no records (never true once constructed)
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of positive (event) records
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    /// Record indices per cohort, in lexicographic cohort order.
    ///
    /// Without cohort tags every record belongs to [`DEFAULT_COHORT`].
    pub fn cohort_groups(&self) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        match &self.cohorts {
            Some(cohorts) => {
                for (i, cohort) in cohorts.iter().enumerate() {
                    groups.entry(cohort.clone()).or_default().push(i);
                }
            }
            None => {
                groups.insert(DEFAULT_COHORT.to_string(), (0..self.len()).collect());
            }
        }
        groups
    }

    /// Record indices per safra, ordered chronologically.
    ///
    /// Safras that all parse as integers (`202301`) are ordered numerically,
    /// anything else lexicographically (ISO `2023-01` labels sort correctly).
    pub fn safra_groups(&self) -> Result<Vec<(String, Vec<usize>)>> {
        let safras = self.safras.as_ref().ok_or_else(|| {
            ScoringError::InvalidInput("sample has no safra tags".to_string())
        })?;

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, safra) in safras.iter().enumerate() {
            groups.entry(safra.as_str()).or_default().push(i);
        }

        let mut ordered: Vec<(String, Vec<usize>)> = groups
            .into_iter()
            .map(|(safra, indices)| (safra.to_string(), indices))
            .collect();
        order_chronologically(&mut ordered);
        Ok(ordered)
    }

    /// Labels and scores of the given records, in the given order
    pub fn select(&self, indices: &[usize]) -> (Vec<bool>, Vec<f64>) {
        indices
            .iter()
            .map(|&i| (self.labels[i], self.scores[i]))
            .unzip()
    }
}

fn order_chronologically(groups: &mut [(String, Vec<usize>)]) {
    let all_numeric = groups
        .iter()
        .all(|(safra, _)| safra.trim().parse::<i64>().is_ok());

    if all_numeric {
        groups.sort_by_key(|(safra, _)| safra.trim().parse::<i64>().unwrap_or_default());
    } else {
        groups.sort_by(|a, b| a.0.cmp(&b.0));
    }
}

/// Convert numeric labels to binary classes.
///
/// Only `0` and `1` are recognised; anything else is an
/// [`ScoringError::InvalidInput`].
pub fn parse_labels(raw: &[f64]) -> Result<Vec<bool>> {
    raw.iter()
        .enumerate()
        .map(|(i, &value)| {
            if value == 1.0 {
                Ok(true)
            } else if value == 0.0 {
                Ok(false)
            } else {
                Err(ScoringError::InvalidInput(format!(
                    "label at position {} is {}, expected 0 or 1",
                    i, value
                )))
            }
        })
        .collect()
}

/// Check that labels and scores are non-empty, equally long, and that every
/// score is finite.
pub fn check_aligned(n_labels: usize, scores: &[f64]) -> Result<()> {
    if n_labels == 0 || scores.is_empty() {
        return Err(ScoringError::InvalidInput("empty input".to_string()));
    }
    if n_labels != scores.len() {
        return Err(ScoringError::InvalidInput(format!(
            "labels length {} != scores length {}",
            n_labels,
            scores.len()
        )));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(ScoringError::InvalidInput(format!(
            "score at position {} is not finite ({})",
            i, scores[i]
        )));
    }
    Ok(())
}

/// Count `(positives, negatives)`
pub fn class_counts(labels: &[bool]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l).count();
    (positives, labels.len() - positives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_labels(&[0.0, 1.0, 1.0]).unwrap(), vec![false, true, true]);
        let err = parse_labels(&[0.0, 2.0]).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
        assert!(parse_labels(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = ScoredSample::from_raw(&[0.0, 1.0, 0.0], &[0.1, 0.2]);
        assert!(matches!(result, Err(ScoringError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert!(ScoredSample::new(vec![], vec![]).is_err());
        assert!(ScoredSample::new(vec![true, false], vec![0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_tag_length_checked() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0], &[0.1, 0.9]).unwrap();
        assert!(sample.with_cohorts(vec!["train".to_string()]).is_err());
    }

    #[test]
    fn test_cohort_groups_default() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0, 0.0], &[0.1, 0.9, 0.3]).unwrap();
        let groups = sample.cohort_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[DEFAULT_COHORT], vec![0, 1, 2]);
    }

    #[test]
    fn test_safra_groups_numeric_order() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0, 0.0, 1.0], &[0.1, 0.9, 0.3, 0.8])
            .unwrap()
            .with_safras(vec!["202310".into(), "20239".into(), "202310".into(), "202401".into()])
            .unwrap();
        let groups = sample.safra_groups().unwrap();
        let order: Vec<&str> = groups.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["20239", "202310", "202401"]);
        assert_eq!(groups[1].1, vec![0, 2]);
    }

    #[test]
    fn test_safra_groups_lexicographic_order() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0, 0.0], &[0.1, 0.9, 0.3])
            .unwrap()
            .with_safras(vec!["2023-11".into(), "2023-02".into(), "2024-01".into()])
            .unwrap();
        let groups = sample.safra_groups().unwrap();
        let order: Vec<&str> = groups.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["2023-02", "2023-11", "2024-01"]);
    }

    #[test]
    fn test_deserialize_validates_sample() {
        let json = r#"{"labels":[true,false],"scores":[0.9,0.1],"cohorts":["a","a","a"]}"#;
        assert!(serde_json::from_str::<ScoredSample>(json).is_err());

        let json = r#"{"labels":[],"scores":[]}"#;
        assert!(serde_json::from_str::<ScoredSample>(json).is_err());

        let json = r#"{"labels":[true,false],"scores":[0.9]}"#;
        assert!(serde_json::from_str::<ScoredSample>(json).is_err());

        let json = r#"{"labels":[true,false],"scores":[0.9,0.1],"safras":["202301","202302"]}"#;
        let sample: ScoredSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample.safras().unwrap()[1], "202302");
        assert!(sample.cohorts().is_none());
    }

    #[test]
    fn test_serialized_sample_reads_back() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0, 1.0], &[0.2, 0.7, 0.4])
            .unwrap()
            .with_cohorts(vec!["train".into(), "test".into(), "test".into()])
            .unwrap();
        let json = serde_json::to_string(&sample).unwrap();
        let parsed: ScoredSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.labels(), sample.labels());
        assert_eq!(parsed.cohorts(), sample.cohorts());
    }

    #[test]
    fn test_select_preserves_order() {
        let sample = ScoredSample::from_raw(&[0.0, 1.0, 0.0], &[0.1, 0.9, 0.3]).unwrap();
        let (labels, scores) = sample.select(&[2, 1]);
        assert_eq!(labels, vec![false, true]);
        assert_eq!(scores, vec![0.3, 0.9]);
    }
}
