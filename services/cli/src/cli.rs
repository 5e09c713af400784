use crate::report::{
    run_evaluate, run_filtered, run_validate, EvaluateArgs, FilteredArgs, ValidateArgs,
};
use clap::{Parser, Subcommand};
use tracing::debug;
use underwriting_engine::config::EngineConfig;
use underwriting_engine::error::AppError;
use underwriting_engine::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "uw",
    about = "Evaluate underwriting decision trees and carrier criteria from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for one request and print a report
    Evaluate(EvaluateArgs),
    /// Export every carrier/product exclusion as CSV
    Filtered(FilteredArgs),
    /// Load rules and criteria and list malformed entries
    Validate(ValidateArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = EngineConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(environment = ?config.environment, "configuration loaded");

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args, &config),
        Command::Filtered(args) => run_filtered(args, &config),
        Command::Validate(args) => run_validate(args),
    }
}
