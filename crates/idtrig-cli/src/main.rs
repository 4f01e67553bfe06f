//! # idtrig CLI entry point
//!
//! Parses command-line arguments, installs logging, and dispatches to the
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use idtrig_cli::config::CliConfig;
use idtrig_cli::evaluate::{run_evaluate, EvaluateArgs};
use idtrig_cli::validate::{run_validate, ValidateArgs};

/// Identity trigger engine CLI.
///
/// Validates trigger definitions and evaluates them against identity
/// snapshots taken before and after a refresh.
#[derive(Parser, Debug)]
#[command(name = "idtrig", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to configuration file (rules, business processes, audit).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the shape of every trigger definition in a file.
    Validate(ValidateArgs),

    /// Run trigger definitions against previous/new identity snapshots.
    Evaluate(EvaluateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so JSON reports on stdout stay parseable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "idtrig starting");

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Evaluate(args) => CliConfig::load(cli.config.as_deref())
            .map_err(anyhow::Error::from)
            .and_then(|config| run_evaluate(&args, config)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
