//! Kolosal Scoring - Main Entry Point
//!
//! Command-line evaluation of scored credit samples.

use clap::Parser;
use kolosal_scoring::cli::{
    cmd_calibration, cmd_evaluate, cmd_lift, cmd_metrics, cmd_psi, cmd_temporal, Cli, Commands,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_scoring=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Metrics { data, columns, threshold, config, output } => {
            cmd_metrics(&data, &columns, threshold, config.as_deref(), output.as_deref())?;
        }
        Commands::Lift { data, columns, quantiles, strict, config, output } => {
            cmd_lift(&data, &columns, quantiles, strict, config.as_deref(), output.as_deref())?;
        }
        Commands::Calibration { data, columns, bins, strategy, config, output } => {
            cmd_calibration(&data, &columns, bins, strategy.as_deref(), config.as_deref(), output.as_deref())?;
        }
        Commands::Psi { reference, current, features, bins, config, output } => {
            cmd_psi(&reference, &current, &features, bins, config.as_deref(), output.as_deref())?;
        }
        Commands::Temporal { data, columns, min_records, strict, config, output } => {
            cmd_temporal(&data, &columns, min_records, strict, config.as_deref(), output.as_deref())?;
        }
        Commands::Evaluate { data, columns, config, output_dir } => {
            cmd_evaluate(&data, &columns, config.as_deref(), output_dir.as_deref())?;
        }
    }

    Ok(())
}
