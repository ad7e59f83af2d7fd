//! Tabular export of evaluation results
//!
//! Every result converts to a `DataFrame` through [`ToFrame`], which can then
//! be written as CSV. Whole results serialize to JSON with [`write_json`].
//! Undefined values (empty calibration bins, lift without events, skipped
//! safras) are exported as nulls, never as zeros.

use crate::calibration::CalibrationCurve;
use crate::drift::{PsiRecord, PsiTable};
use crate::error::Result;
use crate::lift::CohortLift;
use crate::ranking::{CohortMetrics, ConfusionMatrix, PerformanceSummary, RankMetrics, RocCurve};
use crate::temporal::{SafraOutcome, TemporalReport};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Conversion of a result into a flat table
pub trait ToFrame {
    fn to_frame(&self) -> Result<DataFrame>;
}

fn frame(columns: Vec<Series>) -> Result<DataFrame> {
    Ok(DataFrame::new(columns.into_iter().map(Into::into).collect())?)
}

fn counts(values: impl Iterator<Item = usize>) -> Vec<u64> {
    values.map(|v| v as u64).collect()
}

impl ToFrame for RocCurve {
    fn to_frame(&self) -> Result<DataFrame> {
        frame(vec![
            Series::new("threshold".into(), self.points.iter().map(|p| p.threshold).collect::<Vec<_>>()),
            Series::new("fpr".into(), self.points.iter().map(|p| p.fpr).collect::<Vec<_>>()),
            Series::new("tpr".into(), self.points.iter().map(|p| p.tpr).collect::<Vec<_>>()),
            Series::new("false_positives".into(), counts(self.points.iter().map(|p| p.false_positives))),
            Series::new("true_positives".into(), counts(self.points.iter().map(|p| p.true_positives))),
        ])
    }
}

impl ToFrame for RankMetrics {
    fn to_frame(&self) -> Result<DataFrame> {
        frame(vec![
            Series::new("n_records".into(), vec![self.n_records as u64]),
            Series::new("positives".into(), vec![self.positives as u64]),
            Series::new("auc".into(), vec![self.auc]),
            Series::new("ks".into(), vec![self.ks.statistic]),
            Series::new("ks_threshold".into(), vec![self.ks.threshold]),
            Series::new("gini".into(), vec![self.gini]),
        ])
    }
}

impl ToFrame for [CohortMetrics] {
    fn to_frame(&self) -> Result<DataFrame> {
        let ok = |f: &dyn Fn(&PerformanceSummary) -> Option<f64>| -> Vec<Option<f64>> {
            self.iter().map(|c| c.metrics.as_ref().ok().and_then(f)).collect()
        };
        let confusion = |f: &dyn Fn(&ConfusionMatrix) -> usize| -> Vec<Option<u64>> {
            self.iter()
                .map(|c| c.metrics.as_ref().ok().map(|m| f(&m.confusion) as u64))
                .collect()
        };

        frame(vec![
            Series::new("cohort".into(), self.iter().map(|c| c.cohort.clone()).collect::<Vec<_>>()),
            Series::new("n_records".into(), counts(self.iter().map(|c| c.n_records))),
            Series::new("auc".into(), ok(&|m| Some(m.auc))),
            Series::new("ks".into(), ok(&|m| Some(m.ks))),
            Series::new("gini".into(), ok(&|m| Some(m.gini))),
            Series::new("threshold".into(), ok(&|m| Some(m.threshold))),
            Series::new("accuracy".into(), ok(&|m| Some(m.accuracy))),
            Series::new("precision".into(), ok(&|m| m.precision)),
            Series::new("recall".into(), ok(&|m| m.recall)),
            Series::new("f1".into(), ok(&|m| m.f1)),
            Series::new("true_positives".into(), confusion(&|c| c.true_positives)),
            Series::new("false_positives".into(), confusion(&|c| c.false_positives)),
            Series::new("true_negatives".into(), confusion(&|c| c.true_negatives)),
            Series::new("false_negatives".into(), confusion(&|c| c.false_negatives)),
            Series::new(
                "error".into(),
                self.iter()
                    .map(|c| c.metrics.as_ref().err().map(|e| e.to_string()))
                    .collect::<Vec<_>>(),
            ),
        ])
    }
}

impl ToFrame for CohortLift {
    fn to_frame(&self) -> Result<DataFrame> {
        std::slice::from_ref(self).to_frame()
    }
}

/// One row per bucket, cohorts stacked in order
impl ToFrame for [CohortLift] {
    fn to_frame(&self) -> Result<DataFrame> {
        let buckets: Vec<_> = self.iter().flat_map(|t| t.buckets.iter()).collect();
        frame(vec![
            Series::new("cohort".into(), buckets.iter().map(|b| b.cohort.clone()).collect::<Vec<_>>()),
            Series::new("quantile".into(), counts(buckets.iter().map(|b| b.index))),
            Series::new("score_min".into(), buckets.iter().map(|b| b.score_min).collect::<Vec<_>>()),
            Series::new("score_max".into(), buckets.iter().map(|b| b.score_max).collect::<Vec<_>>()),
            Series::new("count".into(), counts(buckets.iter().map(|b| b.count))),
            Series::new("events".into(), counts(buckets.iter().map(|b| b.events))),
            Series::new("event_rate".into(), buckets.iter().map(|b| b.event_rate).collect::<Vec<_>>()),
            Series::new("lift".into(), buckets.iter().map(|b| b.lift).collect::<Vec<_>>()),
            Series::new(
                "cumulative_capture".into(),
                buckets.iter().map(|b| b.cumulative_capture).collect::<Vec<_>>(),
            ),
        ])
    }
}

impl ToFrame for CalibrationCurve {
    fn to_frame(&self) -> Result<DataFrame> {
        let bins = &self.bins;
        frame(vec![
            Series::new("bin".into(), counts(bins.iter().map(|b| b.index))),
            Series::new("lower".into(), bins.iter().map(|b| b.lower).collect::<Vec<_>>()),
            Series::new("upper".into(), bins.iter().map(|b| b.upper).collect::<Vec<_>>()),
            Series::new("count".into(), counts(bins.iter().map(|b| b.count))),
            Series::new("mean_predicted".into(), bins.iter().map(|b| b.mean_predicted()).collect::<Vec<_>>()),
            Series::new("observed_rate".into(), bins.iter().map(|b| b.observed_rate()).collect::<Vec<_>>()),
            Series::new("gap".into(), bins.iter().map(|b| b.gap()).collect::<Vec<_>>()),
            Series::new("empty".into(), bins.iter().map(|b| b.is_empty()).collect::<Vec<_>>()),
        ])
    }
}

/// Per-bin breakdown of one feature
impl ToFrame for PsiRecord {
    fn to_frame(&self) -> Result<DataFrame> {
        let bins = &self.bins;
        frame(vec![
            Series::new("feature".into(), vec![self.feature.clone(); bins.len()]),
            Series::new("bin".into(), counts(1..=bins.len())),
            Series::new("lower".into(), bins.iter().map(|b| b.lower).collect::<Vec<_>>()),
            Series::new("upper".into(), bins.iter().map(|b| b.upper).collect::<Vec<_>>()),
            Series::new("reference_count".into(), counts(bins.iter().map(|b| b.reference_count))),
            Series::new("current_count".into(), counts(bins.iter().map(|b| b.current_count))),
            Series::new("reference_share".into(), bins.iter().map(|b| b.reference_share).collect::<Vec<_>>()),
            Series::new("current_share".into(), bins.iter().map(|b| b.current_share).collect::<Vec<_>>()),
            Series::new("contribution".into(), bins.iter().map(|b| b.contribution).collect::<Vec<_>>()),
        ])
    }
}

/// One row per feature; failed features follow with a null PSI
impl ToFrame for PsiTable {
    fn to_frame(&self) -> Result<DataFrame> {
        let records = &self.records;
        let failures = &self.failures;

        let mut feature: Vec<String> = records.iter().map(|r| r.feature.clone()).collect();
        feature.extend(failures.iter().map(|f| f.feature.clone()));

        let padded_f64 = |values: Vec<f64>| -> Vec<Option<f64>> {
            values.into_iter().map(Some).chain(failures.iter().map(|_| None)).collect()
        };
        let padded_u64 = |values: Vec<u64>| -> Vec<Option<u64>> {
            values.into_iter().map(Some).chain(failures.iter().map(|_| None)).collect()
        };

        let stability: Vec<Option<String>> = records
            .iter()
            .map(|r| Some(r.stability.to_string()))
            .chain(failures.iter().map(|_| None))
            .collect();
        let error: Vec<Option<String>> = records
            .iter()
            .map(|_| None)
            .chain(failures.iter().map(|f| Some(f.error.clone())))
            .collect();

        frame(vec![
            Series::new("feature".into(), feature),
            Series::new("psi".into(), padded_f64(records.iter().map(|r| r.psi).collect())),
            Series::new("stability".into(), stability),
            Series::new("bins".into(), padded_u64(counts(records.iter().map(|r| r.bins.len())))),
            Series::new("reference_size".into(), padded_u64(counts(records.iter().map(|r| r.reference_size)))),
            Series::new("current_size".into(), padded_u64(counts(records.iter().map(|r| r.current_size)))),
            Series::new(
                "reference_missing".into(),
                padded_u64(counts(records.iter().map(|r| r.reference_missing))),
            ),
            Series::new(
                "current_missing".into(),
                padded_u64(counts(records.iter().map(|r| r.current_missing))),
            ),
            Series::new("error".into(), error),
        ])
    }
}

impl ToFrame for TemporalReport {
    fn to_frame(&self) -> Result<DataFrame> {
        let entries = &self.entries;
        let evaluated = |f: fn(f64, f64, f64, f64) -> f64| -> Vec<Option<f64>> {
            entries
                .iter()
                .map(|e| match e.outcome {
                    SafraOutcome::Evaluated { ks, auc, gini, ks_threshold } => Some(f(ks, auc, gini, ks_threshold)),
                    SafraOutcome::Skipped { .. } => None,
                })
                .collect()
        };

        frame(vec![
            Series::new("safra".into(), entries.iter().map(|e| e.safra.clone()).collect::<Vec<_>>()),
            Series::new("n_records".into(), counts(entries.iter().map(|e| e.n_records))),
            Series::new("positives".into(), counts(entries.iter().map(|e| e.positives))),
            Series::new(
                "status".into(),
                entries
                    .iter()
                    .map(|e| if e.ks().is_some() { "evaluated" } else { "skipped" })
                    .collect::<Vec<_>>(),
            ),
            Series::new("ks".into(), evaluated(|ks, _, _, _| ks)),
            Series::new("auc".into(), evaluated(|_, auc, _, _| auc)),
            Series::new("gini".into(), evaluated(|_, _, gini, _| gini)),
            Series::new("ks_threshold".into(), evaluated(|_, _, _, t| t)),
            Series::new(
                "skip_reason".into(),
                entries
                    .iter()
                    .map(|e| e.skip_reason().map(|r| r.to_string()))
                    .collect::<Vec<_>>(),
            ),
        ])
    }
}

/// Write a frame as CSV with a header row
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Serialize any result as pretty-printed JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationBinner;
    use crate::drift::PopulationStabilityIndex;
    use crate::lift::QuantileLiftAnalyzer;
    use crate::ranking::{evaluate_cohorts, DEFAULT_THRESHOLD};
    use crate::sample::ScoredSample;
    use crate::temporal::TemporalStabilityDriver;

    fn sample() -> ScoredSample {
        let labels = [1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let scores = [0.9, 0.2, 0.7, 0.4, 0.3, 0.8, 0.1, 0.6];
        ScoredSample::from_raw(&labels, &scores).unwrap()
    }

    #[test]
    fn test_roc_frame() {
        let metrics = RankMetrics::from_sample(&sample()).unwrap();
        let df = metrics.roc.to_frame().unwrap();
        assert_eq!(df.height(), metrics.roc.points.len());
        assert_eq!(df.width(), 5);

        let summary = metrics.to_frame().unwrap();
        assert_eq!(summary.height(), 1);
        assert_eq!(summary.column("auc").unwrap().f64().unwrap().get(0), Some(metrics.auc));
    }

    #[test]
    fn test_cohort_metrics_frame_keeps_failures() {
        let sample = sample()
            .with_cohorts(vec!["a", "a", "a", "a", "a", "a", "b", "b"].into_iter().map(String::from).collect())
            .unwrap();
        let results = evaluate_cohorts(&sample, DEFAULT_THRESHOLD);
        let df = results.as_slice().to_frame().unwrap();

        assert_eq!(df.height(), 2);
        let auc = df.column("auc").unwrap().f64().unwrap();
        assert!(auc.get(0).is_some());
        assert_eq!(auc.get(1), None);
        assert!(df.column("error").unwrap().str().unwrap().get(1).is_some());
    }

    #[test]
    fn test_empty_calibration_bins_are_null() {
        let curve = CalibrationBinner::default()
            .bin(&[false, true], &[0.05, 0.95])
            .unwrap();
        let df = curve.to_frame().unwrap();

        assert_eq!(df.height(), 10);
        let mean = df.column("mean_predicted").unwrap().f64().unwrap();
        let empty = df.column("empty").unwrap().bool().unwrap();
        assert_eq!(mean.get(4), None);
        assert_eq!(empty.get(4), Some(true));
        assert_eq!(empty.get(0), Some(false));
    }

    #[test]
    fn test_lift_frame_stacks_cohorts() {
        let tables = QuantileLiftAnalyzer::default().analyze(&sample()).unwrap();
        let df = tables.as_slice().to_frame().unwrap();
        assert_eq!(df.height(), 8);
        assert_eq!(df.column("count").unwrap().u64().unwrap().sum(), Some(8));
    }

    #[test]
    fn test_psi_frames() {
        let reference: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let current: Vec<f64> = (0..100).map(|i| i as f64 * 1.5).collect();
        let record = PopulationStabilityIndex::default()
            .compute_slices("income", &reference, &current)
            .unwrap();
        let df = record.to_frame().unwrap();
        assert_eq!(df.height(), record.bins.len());

        let contributions: f64 = df.column("contribution").unwrap().f64().unwrap().sum().unwrap();
        assert!((contributions - record.psi).abs() < 1e-10);
    }

    #[test]
    fn test_temporal_frame_marks_skipped() {
        let sample = sample()
            .with_safras(
                vec!["2023-01", "2023-01", "2023-01", "2023-01", "2023-02", "2023-02", "2023-03", "2023-03"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            )
            .unwrap();
        let report = TemporalStabilityDriver::default().run(&sample).unwrap();
        let df = report.to_frame().unwrap();

        assert_eq!(df.height(), 3);
        let status = df.column("status").unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("evaluated"));
        assert_eq!(status.get(2), Some("skipped"));
        assert_eq!(df.column("ks").unwrap().f64().unwrap().get(2), None);
    }

    #[test]
    fn test_write_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = RankMetrics::from_sample(&sample()).unwrap();

        let csv_path = dir.path().join("roc.csv");
        write_csv(&mut metrics.roc.to_frame().unwrap(), &csv_path).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("threshold,fpr,tpr"));

        let json_path = dir.path().join("metrics.json");
        write_json(&metrics, &json_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert!(value.get("auc").is_some());
    }
}
