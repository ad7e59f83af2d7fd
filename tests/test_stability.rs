//! Integration tests for population stability and temporal stability

use kolosal_scoring::drift::{
    psi_for_frames, psi_from_shares, PopulationStabilityIndex, PsiConfig, PsiThresholds, StabilityClass,
};
use kolosal_scoring::error::ScoringError;
use kolosal_scoring::sample::{shared_numeric_columns, ColumnMapping, ScoredSample};
use kolosal_scoring::temporal::{SkipReason, TemporalConfig, TemporalStabilityDriver};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn normal_like(seed: u64, n: usize, shift: f64) -> Vec<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..6).map(|_| rng.gen::<f64>()).sum::<f64>() + shift)
        .collect()
}

// ============================================================================
// PSI
// ============================================================================

#[test]
fn test_psi_from_known_shares() {
    let psi = psi_from_shares(&[0.5, 0.5], &[0.5, 0.5], 1e-6).unwrap();
    assert_eq!(psi, 0.0);

    let psi = psi_from_shares(&[0.9, 0.1], &[0.1, 0.9], 1e-6).unwrap();
    let expected = 2.0 * 0.8 * 9.0_f64.ln();
    assert!((psi - expected).abs() < 1e-10);
    assert!((psi - 3.52).abs() < 0.01);
    assert_eq!(PsiThresholds::default().classify(psi), StabilityClass::Severe);
}

#[test]
fn test_psi_of_sample_with_itself_is_zero() {
    let values = normal_like(1, 5_000, 0.0);
    let record = PopulationStabilityIndex::default()
        .compute_slices("x", &values, &values)
        .unwrap();

    assert_eq!(record.psi, 0.0);
    assert_eq!(record.stability, StabilityClass::Stable);
    assert_eq!(record.bins.len(), 10);
}

#[test]
fn test_same_distribution_is_stable() {
    let reference = normal_like(2, 10_000, 0.0);
    let current = normal_like(3, 10_000, 0.0);
    let record = PopulationStabilityIndex::default()
        .compute_slices("x", &reference, &current)
        .unwrap();
    assert!(record.psi < 0.10, "psi = {}", record.psi);
}

#[test]
fn test_psi_is_not_antisymmetric() {
    let a = normal_like(4, 5_000, 0.0);
    let b = normal_like(5, 5_000, 0.8);
    let calculator = PopulationStabilityIndex::default();

    let forward = calculator.compute_slices("x", &a, &b).unwrap().psi;
    let backward = calculator.compute_slices("x", &b, &a).unwrap().psi;
    assert!(forward > 0.0);
    assert!(backward > 0.0);
    assert!((forward + backward).abs() > 1e-6);
}

#[test]
fn test_boundary_classification_is_deterministic() {
    let thresholds = PsiThresholds::default();
    assert_eq!(thresholds.classify(0.0999), StabilityClass::Stable);
    assert_eq!(thresholds.classify(0.10), StabilityClass::Moderate);
    assert_eq!(thresholds.classify(0.25), StabilityClass::Moderate);
    assert_eq!(thresholds.classify(0.2501), StabilityClass::Severe);

    let custom = PsiThresholds::new(0.05, 0.20).unwrap();
    assert_eq!(custom.classify(0.10), StabilityClass::Moderate);
    assert_eq!(custom.classify(0.21), StabilityClass::Severe);
    assert!(PsiThresholds::new(0.3, 0.2).is_err());
}

#[test]
fn test_out_of_range_values_land_in_tails() {
    let reference: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let current = vec![1_000.0; 40];
    let record = PopulationStabilityIndex::default()
        .compute_slices("x", &reference, &current)
        .unwrap();

    let last = record.bins.last().unwrap();
    assert_eq!(last.current_count, 40);
    assert_eq!(last.upper, f64::INFINITY);
    assert_eq!(record.bins[0].lower, f64::NEG_INFINITY);
    assert_eq!(record.stability, StabilityClass::Severe);
}

#[test]
fn test_epsilon_changes_sparse_bins() {
    let reference: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let current = vec![99.0; 50];

    let small = PopulationStabilityIndex::new(PsiConfig::default().with_epsilon(1e-6))
        .unwrap()
        .compute_slices("x", &reference, &current)
        .unwrap();
    let large = PopulationStabilityIndex::new(PsiConfig::default().with_epsilon(1e-3))
        .unwrap()
        .compute_slices("x", &reference, &current)
        .unwrap();

    assert!(small.psi > large.psi);
    assert_eq!(small.epsilon, 1e-6);
    assert!(PopulationStabilityIndex::new(PsiConfig::default().with_epsilon(0.0)).is_err());
}

#[test]
fn test_explicit_boundaries() {
    let reference: Vec<f64> = (0..100).map(|i| i as f64).collect();
    let current: Vec<f64> = (0..100).map(|i| i as f64 + 10.0).collect();
    let calculator =
        PopulationStabilityIndex::new(PsiConfig::default().with_boundaries(vec![25.0, 50.0, 75.0])).unwrap();
    let record = calculator.compute_slices("x", &reference, &current).unwrap();

    assert_eq!(record.boundaries, vec![25.0, 50.0, 75.0]);
    assert_eq!(record.bins.len(), 4);
    assert_eq!(record.bins.iter().map(|b| b.reference_count).sum::<usize>(), 100);
    // (-inf, 25] holds 0..=25
    assert_eq!(record.bins[0].reference_count, 26);
    assert_eq!(record.bins[0].current_count, 16);
}

#[test]
fn test_constant_reference_is_insufficient_variation() {
    let err = PopulationStabilityIndex::default()
        .compute_slices("flag", &[1.0; 50], &[1.0, 0.0, 1.0])
        .unwrap_err();
    assert!(matches!(err, ScoringError::InsufficientVariation { distinct: 1, .. }));
}

#[test]
fn test_psi_over_frames() {
    let reference = df!(
        "income" => normal_like(10, 2_000, 0.0),
        "age" => normal_like(11, 2_000, 30.0),
        "segment" => vec!["a"; 2_000]
    )
    .unwrap();
    let current = df!(
        "age" => normal_like(12, 2_000, 30.0),
        "income" => normal_like(13, 2_000, 1.0)
    )
    .unwrap();

    let features = shared_numeric_columns(&reference, &current);
    assert_eq!(features, vec!["income", "age"]);

    let table = psi_for_frames(&PopulationStabilityIndex::default(), &reference, &current, &features).unwrap();
    assert_eq!(table.records.len(), 2);
    assert_eq!(table.records[0].feature, "income");
    assert_eq!(table.get("income").unwrap().stability, StabilityClass::Severe);
    assert_eq!(table.get("age").unwrap().stability, StabilityClass::Stable);
    assert!(table.failures.is_empty());
}

// ============================================================================
// Temporal stability
// ============================================================================

fn vintage_frame() -> DataFrame {
    // safra 9 has no events, safra 11 a single record
    df!(
        "label" => &[1i64, 0, 1, 0, 0, 0, 1, 0, 0, 1, 1],
        "score" => &[0.8, 0.3, 0.7, 0.2, 0.4, 0.5, 0.9, 0.1, 0.6, 0.55, 0.7],
        "safra" => &[10i64, 10, 10, 10, 9, 9, 12, 12, 12, 12, 11]
    )
    .unwrap()
}

#[test]
fn test_temporal_series_in_chronological_order() {
    let sample = ScoredSample::from_frame(&vintage_frame(), &ColumnMapping::default().with_safra("safra")).unwrap();
    let report = TemporalStabilityDriver::default().run(&sample).unwrap();

    let safras: Vec<&str> = report.entries.iter().map(|e| e.safra.as_str()).collect();
    assert_eq!(safras, vec!["9", "10", "11", "12"]);

    let series = report.ks_series();
    assert_eq!(series[0].1, None);
    assert_eq!(series[1].1, Some(1.0));
    assert_eq!(series[2].1, None);
    assert!(series[3].1.is_some());
}

#[test]
fn test_temporal_gaps_carry_reasons() {
    let sample = ScoredSample::from_frame(&vintage_frame(), &ColumnMapping::default().with_safra("safra")).unwrap();
    let report = TemporalStabilityDriver::default().run(&sample).unwrap();

    let reasons: Vec<SkipReason> = report.skipped().filter_map(|e| e.skip_reason()).collect();
    assert_eq!(
        reasons,
        vec![
            SkipReason::MissingClass { positives: 0, negatives: 2 },
            SkipReason::TooFewRecords { count: 1, minimum: 2 },
        ]
    );
    assert_eq!(report.evaluated().count(), 2);
}

#[test]
fn test_temporal_iso_labels_sort_lexicographically() {
    let labels = vec![true, false, true, false, true, false];
    let scores = vec![0.9, 0.1, 0.8, 0.2, 0.7, 0.3];
    let safras = vec!["2024-01", "2024-01", "2023-11", "2023-11", "2023-12", "2023-12"]
        .into_iter()
        .map(String::from)
        .collect();
    let sample = ScoredSample::new(labels, scores).unwrap().with_safras(safras).unwrap();
    let report = TemporalStabilityDriver::default().run(&sample).unwrap();

    let order: Vec<&str> = report.entries.iter().map(|e| e.safra.as_str()).collect();
    assert_eq!(order, vec!["2023-11", "2023-12", "2024-01"]);
}

#[test]
fn test_temporal_strict_mode() {
    let sample = ScoredSample::from_frame(&vintage_frame(), &ColumnMapping::default().with_safra("safra")).unwrap();
    let driver = TemporalStabilityDriver::new(TemporalConfig::default()).unwrap();

    let err = driver.run_strict(&sample).unwrap_err();
    assert!(matches!(err, ScoringError::DegenerateCohort { ref cohort, .. } if cohort == "9"));
}
