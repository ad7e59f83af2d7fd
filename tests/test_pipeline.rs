//! End-to-end tests: scored table in, evaluation tables out

use kolosal_scoring::calibration::brier_score;
use kolosal_scoring::prelude::*;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io::Write;

/// Scored table with train/test cohorts and four monthly safras
fn scored_frame(n: usize) -> DataFrame {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);

    let mut labels = Vec::with_capacity(n);
    let mut scores = Vec::with_capacity(n);
    let mut cohorts = Vec::with_capacity(n);
    let mut safras = Vec::with_capacity(n);

    for i in 0..n {
        let risk: f64 = rng.gen();
        let bad = rng.gen::<f64>() < 0.05 + 0.3 * risk;
        labels.push(bad as i64);
        scores.push((0.8 * risk + 0.2 * rng.gen::<f64>()).clamp(0.0, 1.0));
        cohorts.push(if i % 4 == 0 { "test" } else { "train" });
        safras.push(202301 + (i % 4) as i64);
    }

    df!(
        "id" => (0..n).map(|i| format!("c{:05}", i)).collect::<Vec<_>>(),
        "bad" => labels,
        "pd" => scores,
        "split" => cohorts,
        "vintage" => safras
    )
    .unwrap()
}

fn mapping() -> ColumnMapping {
    ColumnMapping::new("bad", "pd")
        .with_id("id")
        .with_cohort("split")
        .with_safra("vintage")
}

fn read_csv(path: &std::path::Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .unwrap()
        .finish()
        .unwrap()
}

#[test]
fn test_full_evaluation_from_frame() {
    let sample = ScoredSample::from_frame(&scored_frame(4_000), &mapping()).unwrap();
    assert_eq!(sample.len(), 4_000);

    let overall = RankMetrics::from_sample(&sample).unwrap();
    assert!(overall.auc > 0.58, "auc = {}", overall.auc);
    assert!(overall.ks.statistic > 0.1);

    let cohorts = evaluate_cohorts(&sample, 0.5);
    assert_eq!(cohorts.iter().map(|c| c.cohort.as_str()).collect::<Vec<_>>(), vec!["test", "train"]);
    assert!(cohorts.iter().all(|c| c.metrics.is_ok()));

    let lift = QuantileLiftAnalyzer::default().analyze(&sample).unwrap();
    assert_eq!(lift.len(), 2);
    for table in &lift {
        assert_eq!(table.buckets.iter().map(|b| b.count).sum::<usize>(), table.n_records);
        assert!(table.buckets[9].event_rate >= table.buckets[0].event_rate);
    }

    let curve = CalibrationBinner::default().bin(sample.labels(), sample.scores()).unwrap();
    assert_eq!(curve.bins.iter().map(|b| b.count).sum::<usize>(), 4_000);
    let brier = brier_score(sample.labels(), sample.scores()).unwrap();
    assert_eq!(curve.brier_score, brier);
    assert!(brier > 0.0 && brier < 1.0);

    let report = TemporalStabilityDriver::default().run(&sample).unwrap();
    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.entries[0].safra, "202301");
    assert_eq!(report.evaluated().count(), 4);
}

#[test]
fn test_export_tables_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let sample = ScoredSample::from_frame(&scored_frame(1_000), &mapping()).unwrap();

    let lift = QuantileLiftAnalyzer::new(LiftConfig::new(5)).unwrap().analyze(&sample).unwrap();
    let lift_path = dir.path().join("lift.csv");
    write_csv(&mut lift.as_slice().to_frame().unwrap(), &lift_path).unwrap();

    let df = read_csv(&lift_path);
    assert_eq!(df.height(), 10);
    assert_eq!(
        df.column("count").unwrap().cast(&DataType::Int64).unwrap().i64().unwrap().sum(),
        Some(1_000)
    );

    let calibration = CalibrationBinner::new(CalibrationConfig::new(20, BinningStrategy::FixedWidth))
        .unwrap()
        .bin(sample.labels(), sample.scores())
        .unwrap();
    let calibration_path = dir.path().join("calibration.csv");
    write_csv(&mut calibration.to_frame().unwrap(), &calibration_path).unwrap();

    let df = read_csv(&calibration_path);
    assert_eq!(df.height(), 20);
    let empty_rows = df
        .column("empty")
        .unwrap()
        .bool()
        .unwrap()
        .into_iter()
        .filter(|v| *v == Some(true))
        .count();
    assert_eq!(empty_rows, calibration.empty_bins());
    assert_eq!(df.column("mean_predicted").unwrap().null_count(), calibration.empty_bins());
}

#[test]
fn test_psi_table_export() {
    let dir = tempfile::tempdir().unwrap();
    let reference = scored_frame(2_000);
    let mut current = scored_frame(2_000);
    current
        .with_column(Series::new("pd".into(), (0..2_000).map(|i| (i % 100) as f64 / 100.0).collect::<Vec<_>>()))
        .unwrap();

    let features = vec!["pd".to_string(), "vintage".to_string()];
    let table = psi_for_frames(&PopulationStabilityIndex::default(), &reference, &current, &features).unwrap();
    assert_eq!(table.records.len(), 2);
    assert_eq!(table.get("vintage").unwrap().psi, 0.0);

    let path = dir.path().join("psi.csv");
    write_csv(&mut table.to_frame().unwrap(), &path).unwrap();
    let df = read_csv(&path);
    assert_eq!(df.height(), 2);
    assert_eq!(df.column("feature").unwrap().str().unwrap().get(0), Some("pd"));
}

#[test]
fn test_config_file_drives_analyzers() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "lift": {{ "n_quantiles": 4, "policy": "fail" }},
            "calibration": {{ "n_bins": 5, "strategy": "quantile" }},
            "psi": {{ "epsilon": 0.0001, "thresholds": {{ "moderate": 0.05, "severe": 0.2 }} }},
            "temporal": {{ "min_records": 300 }},
            "classification_threshold": 0.25
        }}"#
    )
    .unwrap();
    let config = EvaluationConfig::from_json_file(file.path()).unwrap();
    let sample = ScoredSample::from_frame(&scored_frame(1_000), &mapping()).unwrap();

    let lift = QuantileLiftAnalyzer::new(config.lift.clone()).unwrap().analyze(&sample).unwrap();
    assert!(lift.iter().all(|t| t.buckets.len() == 4));

    let curve = CalibrationBinner::new(config.calibration.clone())
        .unwrap()
        .bin(sample.labels(), sample.scores())
        .unwrap();
    assert_eq!(curve.strategy, BinningStrategy::Quantile);
    assert_eq!(curve.bins.len(), 5);

    assert_eq!(config.psi.thresholds.classify(0.1), StabilityClass::Moderate);

    // 250 records per vintage, below the configured minimum
    let report = TemporalStabilityDriver::new(config.temporal.clone()).unwrap().run(&sample).unwrap();
    assert_eq!(report.skipped().count(), 4);

    let cohorts = evaluate_cohorts(&sample, config.classification_threshold);
    assert_eq!(cohorts[0].metrics.as_ref().unwrap().threshold, 0.25);
}

#[test]
fn test_invalid_label_column_rejected() {
    let df = df!(
        "label" => &[0i64, 1, 2],
        "score" => &[0.1, 0.5, 0.9]
    )
    .unwrap();
    let err = ScoredSample::from_frame(&df, &ColumnMapping::default()).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidInput(_)));
}
