//! NEES: filter consistency evaluation against ground truth.
//!
//! Loads a ground truth trajectory and an estimate trajectory (CSV, see [`nees::messages`]), interpolates
//! the truth onto every estimate timestamp and computes the Normalized Estimated Error Squared. The
//! summary is logged; the per-sample values can be written to a CSV file.

mod common;

use clap::{Args, Parser, Subcommand};
use common::{ensure_parent_dir, init_logger, validate_input_file};
use log::{error, info, warn};
use std::error::Error;
use std::path::PathBuf;

use nees::messages::load_trajectory;
use nees::{EvaluationConfig, STATE_DIMENSION, evaluate_with_config};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Evaluate estimator consistency (NEES) against ground truth.")]
struct Cli {
    /// Evaluation settings file (TOML/JSON/YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,

    /// Log level (off, error, warn, info, debug, trace); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Clone)]
enum Command {
    /// Compute NEES of an estimate trajectory against ground truth
    Evaluate(EvaluateArgs),
    /// Write a configuration file with default settings
    #[command(name = "config")]
    CreateConfig(CreateConfigArgs),
}

#[derive(Args, Clone, Debug)]
struct EvaluateArgs {
    /// Ground truth trajectory CSV
    #[arg(short, long)]
    truth: PathBuf,
    /// Estimated trajectory CSV
    #[arg(short, long)]
    estimate: PathBuf,
    /// Output CSV for per-sample NEES (index, timestamp, nees)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Where to write the configuration; the extension selects the format
    #[arg(short, long, default_value = "nees.toml")]
    output: PathBuf,
}

fn run_evaluate(args: &EvaluateArgs, config: &EvaluationConfig) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    validate_input_file(&args.truth)?;
    validate_input_file(&args.estimate)?;

    let truths = load_trajectory(&args.truth, config.symmetry_tolerance)?;
    info!(
        "Loaded {} truth samples from {}",
        truths.len(),
        args.truth.display()
    );
    let estimates = load_trajectory(&args.estimate, config.symmetry_tolerance)?;
    info!(
        "Loaded {} estimate samples from {}",
        estimates.len(),
        args.estimate.display()
    );
    if truths.len() < 2 {
        warn!("Fewer than two truth samples; no estimate can be aligned");
    }

    let report = evaluate_with_config(&estimates, &truths, config);
    for failure in &report.failures {
        error!(
            "Estimate {} (t={:.6}) could not be scored: {}",
            failure.index, failure.timestamp, failure.error
        );
    }
    match report.mean() {
        Some(mean) => info!(
            "Average NEES {:.4} over {} samples (dimension {}): {}",
            mean,
            report.len(),
            STATE_DIMENSION,
            if report.is_consistent() {
                "consistent"
            } else {
                "inconsistent"
            }
        ),
        None => warn!("No estimate could be scored"),
    }

    if let Some(output) = &args.output {
        ensure_parent_dir(output)?;
        report.to_csv(output)?;
        info!("Wrote {} NEES values to {}", report.len(), output.display());
    }
    Ok(())
}

fn create_config_file(args: &CreateConfigArgs) -> Result<(), Box<dyn Error>> {
    ensure_parent_dir(&args.output)?;
    EvaluationConfig::default().to_file(&args.output)?;
    println!("Configuration written to {}", args.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EvaluationConfig::from_file(path)?,
        None => EvaluationConfig::default(),
    };
    // CLI flags take precedence over the config file
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str());
    let log_file = cli.log_file.as_ref().or(config.logging.file.as_ref());
    init_logger(log_level, log_file)?;

    match &cli.command {
        Command::Evaluate(args) => run_evaluate(args, &config),
        Command::CreateConfig(args) => create_config_file(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_evaluate_args() {
        let cli = Cli::parse_from([
            "nees",
            "evaluate",
            "--truth",
            "truth.csv",
            "--estimate",
            "estimate.csv",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Evaluate(args) => {
                assert_eq!(args.truth, PathBuf::from("truth.csv"));
                assert_eq!(args.estimate, PathBuf::from("estimate.csv"));
                assert!(args.output.is_none());
            }
            Command::CreateConfig(_) => panic!("expected evaluate"),
        }
    }

    #[test]
    fn parse_config_command_default_output() {
        let cli = Cli::parse_from(["nees", "config"]);
        match cli.command {
            Command::CreateConfig(args) => assert_eq!(args.output, PathBuf::from("nees.toml")),
            Command::Evaluate(_) => panic!("expected config"),
        }
    }

    #[test]
    fn evaluate_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = EvaluateArgs {
            truth: dir.path().join("truth.csv"),
            estimate: dir.path().join("estimate.csv"),
            output: None,
        };
        let config = EvaluationConfig {
            snap_tolerance: -1.0,
            ..Default::default()
        };
        let err = run_evaluate(&args, &config).unwrap_err();
        assert!(err.to_string().contains("snap_tolerance"), "{err}");
    }

    #[test]
    fn create_config_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cfg").join("nees.yaml");
        create_config_file(&CreateConfigArgs {
            output: output.clone(),
        })
        .unwrap();
        assert_eq!(
            EvaluationConfig::from_file(&output).unwrap(),
            EvaluationConfig::default()
        );
    }
}
