//! The goldcheck command-line interface.
//!
//! Parses arguments, installs logging, runs the harness and turns the outcome
//! into a process exit code (see [`RunStatus`]).

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{GoldcheckArgs, OutputFormat};
use crate::errors::{HarnessError, HarnessResult};
use crate::harness::report::{RunStatus, TextOptions};
use crate::harness::Harness;

pub mod args;
pub mod output;

/// The main entry point for the CLI. Returns the process exit code.
pub fn run() -> i32 {
    let args = GoldcheckArgs::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(status) => status.exit_code(),
        Err(e) => {
            output::print_error(e);
            RunStatus::InfrastructureError.exit_code()
        }
    }
}

fn execute(args: &GoldcheckArgs) -> HarnessResult<RunStatus> {
    let config = args.harness_config()?;
    let harness = Harness::new(config)?;
    let summary = harness.run()?;

    let printed = match args.format {
        OutputFormat::Text => output::print_text(
            &summary,
            TextOptions {
                show_diff: args.diff,
            },
            args.color,
        ),
        OutputFormat::Json => output::print_json(&summary),
    };
    printed.map_err(|source| HarnessError::Report { source })?;

    Ok(summary.status())
}

/// Logs go to stderr. `RUST_LOG` wins; otherwise `-v` raises the level from `warn`.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
