//! Handles all user-facing output for the CLI.
//!
//! Verdict lines go to stdout. Everything else (failure details, rejected
//! fixtures, the closing summary, fatal diagnostics) goes to stderr, so stdout
//! stays a clean one-line-per-case report.

use std::io::{self, Write};

use miette::Report;
use termcolor::{ColorChoice, StandardStream};

use crate::cli::args::ColorMode;
use crate::errors::HarnessError;
use crate::harness::report::{self, RunSummary, TextOptions};

fn color_choice(mode: ColorMode, stream: atty::Stream) -> ColorChoice {
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto if atty::is(stream) => ColorChoice::Auto,
        ColorMode::Auto => ColorChoice::Never,
    }
}

/// Prints the human-readable report.
pub fn print_text(summary: &RunSummary, options: TextOptions, mode: ColorMode) -> io::Result<()> {
    let mut out = StandardStream::stdout(color_choice(mode, atty::Stream::Stdout));
    let mut err = StandardStream::stderr(color_choice(mode, atty::Stream::Stderr));
    report::write_text(summary, options, &mut out, &mut err)
}

/// Prints the machine-readable report as a single JSON document.
pub fn print_json(summary: &RunSummary) -> io::Result<()> {
    let json = summary.to_json()?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    stdout.flush()
}

/// Renders a run-fatal error with its diagnostic code and help.
pub fn print_error(error: HarnessError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}
