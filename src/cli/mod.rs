//! Kolosal Scoring CLI Module
//!
//! Command-line interface for evaluating scored samples.

use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::calibration::{BinContents, BinningStrategy, CalibrationBinner, CalibrationCurve};
use crate::config::EvaluationConfig;
use crate::drift::{psi_for_frames, PopulationStabilityIndex, StabilityClass};
use crate::export::{write_csv, write_json, ToFrame};
use crate::lift::{CohortLift, QuantileLiftAnalyzer, VariationPolicy};
use crate::ranking::{evaluate_cohorts, RankMetrics};
use crate::sample::{shared_numeric_columns, ColumnMapping, ScoredSample};
use crate::temporal::{SafraOutcome, TemporalReport, TemporalStabilityDriver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<14}", key)), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn stability_label(class: StabilityClass) -> ColoredString {
    match class {
        StabilityClass::Stable => ok("stable"),
        StabilityClass::Moderate => "moderate".yellow(),
        StabilityClass::Severe => "severe".red().bold(),
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "n/a".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-scoring")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluation toolkit for binary credit-scoring models")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Column names of the scored table
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    /// Label column (0 = non-event, 1 = event)
    #[arg(long, default_value = "label")]
    pub label: String,

    /// Score column
    #[arg(long, default_value = "score")]
    pub score: String,

    /// Record id column
    #[arg(long)]
    pub id: Option<String>,

    /// Cohort column (e.g. train/test)
    #[arg(long)]
    pub cohort: Option<String>,

    /// Origination period column
    #[arg(long)]
    pub safra: Option<String>,
}

impl ColumnArgs {
    pub fn mapping(&self) -> ColumnMapping {
        let mut mapping = ColumnMapping::new(&self.label, &self.score);
        if let Some(id) = &self.id {
            mapping = mapping.with_id(id);
        }
        if let Some(cohort) = &self.cohort {
            mapping = mapping.with_cohort(cohort);
        }
        if let Some(safra) = &self.safra {
            mapping = mapping.with_safra(safra);
        }
        mapping
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// AUC, KS, Gini and threshold metrics per cohort
    Metrics {
        /// Scored data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Decision threshold for the confusion matrix
        #[arg(long)]
        threshold: Option<f64>,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Quantile lift table per cohort
    Lift {
        /// Scored data file
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Number of quantile buckets
        #[arg(short, long)]
        quantiles: Option<usize>,

        /// Fail instead of reducing buckets when scores have too few distinct values
        #[arg(long)]
        strict: bool,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Calibration curve of predicted probabilities
    Calibration {
        /// Scored data file
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Number of bins
        #[arg(short, long)]
        bins: Option<usize>,

        /// Binning strategy (fixed_width, quantile)
        #[arg(long)]
        strategy: Option<String>,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Population Stability Index between two tables
    Psi {
        /// Reference data file
        #[arg(short, long)]
        reference: PathBuf,

        /// Current data file
        #[arg(long)]
        current: PathBuf,

        /// Features to compare (default: all shared numeric columns)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,

        /// Number of reference quantile bins
        #[arg(short, long)]
        bins: Option<usize>,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// KS and AUC per origination period
    Temporal {
        /// Scored data file
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Minimum records per period
        #[arg(long)]
        min_records: Option<usize>,

        /// Fail on the first period that cannot be evaluated
        #[arg(long)]
        strict: bool,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (CSV or JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run every evaluation on one scored file
    Evaluate {
        /// Scored data file
        #[arg(short, long)]
        data: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Evaluation config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for CSV tables and summary.json
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let df = match ext {
        "csv" => CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "json" => JsonReader::new(std::fs::File::open(path)?)
            .finish()?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?)
            .finish()?,
        _ => anyhow::bail!("Unsupported file format: {}", ext),
    };

    Ok(df)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EvaluationConfig> {
    match path {
        Some(path) => {
            let config = EvaluationConfig::from_json_file(path)?;
            step_ok(&format!("Config {}", path.display()));
            Ok(config)
        }
        None => Ok(EvaluationConfig::default()),
    }
}

fn load_sample(path: &Path, columns: &ColumnArgs) -> anyhow::Result<ScoredSample> {
    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(path)?;
    let sample = ScoredSample::from_frame(&df, &columns.mapping())?;
    step_done(&format!(
        "{} rows, {} events in {:?}",
        sample.len(),
        sample.positives(),
        start.elapsed()
    ));
    Ok(sample)
}

/// Write a result table; `.json` gets JSON rows, anything else CSV
fn save_table(mut df: DataFrame, path: &Path) -> anyhow::Result<()> {
    step_run(&format!("Saving → {}", path.display()));
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let mut file = std::fs::File::create(path)?;
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(&mut df)?;
        }
        _ => write_csv(&mut df, path)?,
    }
    step_done(&format!("{} rows", df.height()));
    Ok(())
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_metrics(
    data_path: &Path,
    columns: &ColumnArgs,
    threshold: Option<f64>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Rank metrics");

    let config = load_config(config_path)?;
    let threshold = threshold.unwrap_or(config.classification_threshold);
    let sample = load_sample(data_path, columns)?;

    step_run("Computing");
    let start = Instant::now();
    let results = evaluate_cohorts(&sample, threshold);
    step_done(&format!("{} cohorts in {:?}", results.len(), start.elapsed()));

    println!();
    println!(
        "  {:<12} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        muted("Cohort"), muted("N"), muted("AUC"), muted("KS"), muted("Gini"), muted("Prec"), muted("Recall")
    );
    println!("  {}", dim(&"─".repeat(68)));

    for cohort in &results {
        match &cohort.metrics {
            Ok(m) => println!(
                "  {:<12} {:>8} {:>8.4} {:>8.4} {:>8.4} {:>8} {:>8}",
                cohort.cohort,
                cohort.n_records,
                m.auc,
                m.ks,
                m.gini,
                fmt_opt(m.precision),
                fmt_opt(m.recall)
            ),
            Err(e) => println!(
                "  {:<12} {:>8} {}",
                cohort.cohort,
                cohort.n_records,
                format!("err: {}", e).red()
            ),
        }
    }
    println!("  {}", dim(&"─".repeat(68)));

    for (cohort, rank) in results.iter().filter_map(|c| c.rank.as_ref().map(|r| (c, r))) {
        println!();
        println!(
            "  {} {} {} {:.4} {} {:.4}",
            ok("ks"),
            cohort.cohort.white().bold(),
            muted("peaks at score"),
            rank.ks.threshold,
            muted("with"),
            rank.ks.statistic
        );
    }

    if let Some(path) = output {
        save_table(results.as_slice().to_frame()?, path)?;
    }

    println!();
    Ok(())
}

fn reduced_buckets_note(table: &CohortLift) -> String {
    format!(
        "only {distinct} distinct scores, using {used} of {requested} buckets",
        distinct = table.n_quantiles,
        used = table.buckets.len(),
        requested = table.requested_quantiles
    )
}

fn print_lift(table: &CohortLift) {
    section(&format!("Lift · {}", table.cohort));
    if table.was_reduced() {
        println!("  {}", reduced_buckets_note(table).yellow());
    }
    println!(
        "  {:>4} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}",
        muted("Q"), muted("Min"), muted("Max"), muted("N"), muted("Events"), muted("Rate"), muted("Lift")
    );
    for b in &table.buckets {
        println!(
            "  {:>4} {:>10.4} {:>10.4} {:>8} {:>8} {:>8.4} {:>8}",
            b.index,
            b.score_min,
            b.score_max,
            b.count,
            b.events,
            b.event_rate,
            b.lift.map(|l| format!("{:.2}", l)).unwrap_or_else(|| "n/a".to_string())
        );
    }
}

pub fn cmd_lift(
    data_path: &Path,
    columns: &ColumnArgs,
    quantiles: Option<usize>,
    strict: bool,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Quantile lift");

    let mut lift_config = load_config(config_path)?.lift;
    if let Some(q) = quantiles {
        lift_config.n_quantiles = q;
    }
    if strict {
        lift_config.policy = VariationPolicy::Fail;
    }
    let sample = load_sample(data_path, columns)?;

    let analyzer = QuantileLiftAnalyzer::new(lift_config)?;
    let tables = analyzer.analyze(&sample)?;
    for table in &tables {
        if table.was_reduced() {
            tracing::warn!(
                cohort = %table.cohort,
                requested = table.requested_quantiles,
                used = table.n_quantiles,
                "Too few distinct scores, buckets reduced"
            );
        }
        print_lift(table);
    }

    if let Some(path) = output {
        save_table(tables.as_slice().to_frame()?, path)?;
    }

    println!();
    Ok(())
}

fn print_calibration(curve: &CalibrationCurve) {
    println!(
        "  {:>4} {:>14} {:>8} {:>10} {:>10}",
        muted("Bin"), muted("Range"), muted("N"), muted("Predicted"), muted("Observed")
    );
    for bin in &curve.bins {
        let range = format!("{:.2}-{:.2}", bin.lower, bin.upper);
        match bin.contents {
            BinContents::Observed { mean_predicted, observed_rate } => println!(
                "  {:>4} {:>14} {:>8} {:>10.4} {:>10.4}",
                bin.index, range, bin.count, mean_predicted, observed_rate
            ),
            BinContents::Empty => println!("  {:>4} {:>14} {:>8} {:>10}", bin.index, range, 0, dim("empty")),
        }
    }
    println!();
    println!("  {}", kv("Brier", &format!("{:.4}", curve.brier_score)));
    println!("  {}", kv("ECE", &format!("{:.4}", curve.expected_calibration_error)));
    println!("  {}", kv("MCE", &format!("{:.4}", curve.maximum_calibration_error)));
}

pub fn cmd_calibration(
    data_path: &Path,
    columns: &ColumnArgs,
    bins: Option<usize>,
    strategy: Option<&str>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Calibration");

    let mut calibration_config = load_config(config_path)?.calibration;
    if let Some(n) = bins {
        calibration_config.n_bins = n;
    }
    if let Some(s) = strategy {
        calibration_config.strategy = s.parse::<BinningStrategy>()?;
    }
    let sample = load_sample(data_path, columns)?;

    let binner = CalibrationBinner::new(calibration_config)?;
    let curve = binner.bin(sample.labels(), sample.scores())?;
    println!();
    print_calibration(&curve);

    if let Some(path) = output {
        save_table(curve.to_frame()?, path)?;
    }

    println!();
    Ok(())
}

pub fn cmd_psi(
    reference_path: &Path,
    current_path: &Path,
    features: &[String],
    bins: Option<usize>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Population stability");

    let mut psi_config = load_config(config_path)?.psi;
    if let Some(n) = bins {
        psi_config = psi_config.with_bins(n);
    }

    step_run("Loading reference");
    let reference = load_data(reference_path)?;
    step_done(&format!("{} rows × {} cols", reference.height(), reference.width()));

    step_run("Loading current");
    let current = load_data(current_path)?;
    step_done(&format!("{} rows × {} cols", current.height(), current.width()));

    let features = if features.is_empty() {
        shared_numeric_columns(&reference, &current)
    } else {
        features.to_vec()
    };
    if features.is_empty() {
        anyhow::bail!("No numeric columns shared by both files");
    }

    step_run(&format!("Computing PSI for {} features", features.len()));
    let start = Instant::now();
    let calculator = PopulationStabilityIndex::new(psi_config)?;
    let table = psi_for_frames(&calculator, &reference, &current, &features)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<24} {:>10} {:>10}", muted("Feature"), muted("PSI"), muted("Class"));
    println!("  {}", dim(&"─".repeat(46)));
    for record in &table.records {
        println!("  {:<24} {:>10.4} {:>10}", record.feature, record.psi, stability_label(record.stability));
    }
    for failure in &table.failures {
        println!("  {:<24} {}", failure.feature, format!("err: {}", failure.error).red());
    }
    println!("  {}", dim(&"─".repeat(46)));

    let flagged = table.at_least(StabilityClass::Moderate);
    if flagged.is_empty() {
        println!();
        step_ok("All features stable");
    } else {
        println!();
        println!("  {} {}", "shifted".yellow(), flagged.join(", ").white());
    }

    if let Some(path) = output {
        save_table(table.to_frame()?, path)?;
    }

    println!();
    Ok(())
}

fn print_temporal(report: &TemporalReport) {
    println!(
        "  {:<12} {:>8} {:>8} {:>8} {:>8}",
        muted("Safra"), muted("N"), muted("Events"), muted("KS"), muted("AUC")
    );
    println!("  {}", dim(&"─".repeat(48)));
    for entry in &report.entries {
        match &entry.outcome {
            SafraOutcome::Evaluated { ks, auc, .. } => println!(
                "  {:<12} {:>8} {:>8} {:>8.4} {:>8.4}",
                entry.safra, entry.n_records, entry.positives, ks, auc
            ),
            SafraOutcome::Skipped { reason } => println!(
                "  {:<12} {:>8} {:>8} {}",
                entry.safra,
                entry.n_records,
                entry.positives,
                dim(&format!("skipped: {}", reason))
            ),
        }
    }
    println!("  {}", dim(&"─".repeat(48)));
    if let Some((lo, hi)) = report.ks_range() {
        println!();
        println!("  {}", kv("KS range", &format!("{:.4} - {:.4}", lo, hi)));
    }
}

pub fn cmd_temporal(
    data_path: &Path,
    columns: &ColumnArgs,
    min_records: Option<usize>,
    strict: bool,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Temporal stability");

    let mut temporal_config = load_config(config_path)?.temporal;
    if let Some(n) = min_records {
        temporal_config.min_records = n;
    }
    if columns.safra.is_none() {
        anyhow::bail!("--safra is required for temporal analysis");
    }
    let sample = load_sample(data_path, columns)?;

    let driver = TemporalStabilityDriver::new(temporal_config)?;
    let report = if strict {
        driver.run_strict(&sample)?
    } else {
        driver.run(&sample)?
    };
    println!();
    print_temporal(&report);

    if let Some(path) = output {
        save_table(report.to_frame()?, path)?;
    }

    println!();
    Ok(())
}

/// Everything `evaluate` computes, as written to `summary.json`
#[derive(Serialize)]
struct EvaluationSummary<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    config: &'a EvaluationConfig,
    overall: &'a RankMetrics,
    lift: &'a [CohortLift],
    calibration: Option<&'a CalibrationCurve>,
    temporal: Option<&'a TemporalReport>,
}

pub fn cmd_evaluate(
    data_path: &Path,
    columns: &ColumnArgs,
    config_path: Option<&Path>,
    output_dir: Option<&Path>,
) -> anyhow::Result<()> {
    section("Evaluate");

    let config = load_config(config_path)?;
    let sample = load_sample(data_path, columns)?;

    step_run("Rank metrics");
    let start = Instant::now();
    let overall = RankMetrics::from_sample(&sample)?;
    let cohorts = evaluate_cohorts(&sample, config.classification_threshold);
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Lift");
    let tables = QuantileLiftAnalyzer::new(config.lift.clone())?.analyze(&sample)?;
    step_done(&format!("{} cohorts", tables.len()));

    step_run("Calibration");
    let calibration = match CalibrationBinner::new(config.calibration.clone())?.bin(sample.labels(), sample.scores()) {
        Ok(curve) => {
            step_done(&format!("{} bins", curve.bins.len()));
            Some(curve)
        }
        Err(e) => {
            println!("{}", "skipped".yellow());
            tracing::warn!(error = %e, "Calibration not computed");
            None
        }
    };

    let temporal = if sample.safras().is_some() {
        step_run("Temporal");
        let report = TemporalStabilityDriver::new(config.temporal.clone())?.run(&sample)?;
        step_done(&format!("{} safras, {} skipped", report.entries.len(), report.skipped().count()));
        Some(report)
    } else {
        None
    };

    section("Summary");
    println!("  {}", kv("Records", &sample.len().to_string()));
    println!("  {}", kv("Events", &sample.positives().to_string()));
    println!("  {}", kv("AUC", &format!("{:.4}", overall.auc)));
    println!("  {}", kv("KS", &format!("{:.4}", overall.ks.statistic)));
    println!("  {}", kv("Gini", &format!("{:.4}", overall.gini)));
    if let Some(curve) = &calibration {
        println!("  {}", kv("Brier", &format!("{:.4}", curve.brier_score)));
        println!("  {}", kv("ECE", &format!("{:.4}", curve.expected_calibration_error)));
    }
    if let Some((lo, hi)) = temporal.as_ref().and_then(|r| r.ks_range()) {
        println!("  {}", kv("KS range", &format!("{:.4} - {:.4}", lo, hi)));
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        save_table(cohorts.as_slice().to_frame()?, &dir.join("metrics.csv"))?;
        save_table(overall.roc.to_frame()?, &dir.join("roc.csv"))?;
        save_table(tables.as_slice().to_frame()?, &dir.join("lift.csv"))?;
        if let Some(curve) = &calibration {
            save_table(curve.to_frame()?, &dir.join("calibration.csv"))?;
        }
        if let Some(report) = &temporal {
            save_table(report.to_frame()?, &dir.join("temporal.csv"))?;
        }

        let summary = EvaluationSummary {
            generated_at: chrono::Utc::now(),
            config: &config,
            overall: &overall,
            lift: &tables,
            calibration: calibration.as_ref(),
            temporal: temporal.as_ref(),
        };
        let summary_path = dir.join("summary.json");
        write_json(&summary, &summary_path)?;
        step_ok(&format!("Summary → {}", summary_path.display()));
    }

    println!();
    Ok(())
}
