//! Defines the command-line arguments for the goldcheck CLI.
//!
//! Harness settings are optional here so that a `--config` file can supply them;
//! a flag given on the command line always wins over the file.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::HarnessConfig;
use crate::errors::HarnessResult;
use crate::harness::StderrMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "goldcheck",
    version,
    about = "Runs a program under test on every input fixture and compares its output with golden files."
)]
pub struct GoldcheckArgs {
    /// Directory holding input fixtures and expected outputs [default: testcases/phase2]
    #[arg(short = 'd', long = "fixtures", value_name = "DIR")]
    pub fixtures: Option<PathBuf>,

    /// Directory that receives actual outputs [default: output]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Program under test, invoked as `<program> [args...] <input>` [default: ./mypython.exe]
    #[arg(short = 'p', long = "program", value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// Extra argument placed before the input path (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub program_args: Vec<String>,

    /// File name prefix of input fixtures [default: in]
    #[arg(long, value_name = "S")]
    pub input_marker: Option<String>,

    /// File name prefix of expected and actual outputs [default: out]
    #[arg(long, value_name = "S")]
    pub output_marker: Option<String>,

    /// Extension of input fixtures [default: py]
    #[arg(long = "input-ext", value_name = "S")]
    pub input_extension: Option<String>,

    /// Extension of expected and actual outputs [default: txt]
    #[arg(long = "expected-ext", value_name = "S")]
    pub expected_extension: Option<String>,

    /// Number of cases run in parallel, 0 for one per CPU [default: 1]
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-case timeout in seconds, 0 to disable [default: 10]
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only run cases whose identifier contains this substring
    #[arg(long, value_name = "SUBSTR")]
    pub filter: Option<String>,

    /// What to do with the program's standard error [default: inherit]
    #[arg(long, value_enum)]
    pub stderr: Option<StderrMode>,

    /// Print a line diff for every mismatching case
    #[arg(long)]
    pub diff: bool,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[arg(long, value_enum, default_value = "auto")]
    pub color: ColorMode,

    /// YAML file with harness settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raise the log level (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GoldcheckArgs {
    /// Layers the flags over the configuration file (or the defaults).
    pub fn harness_config(&self) -> HarnessResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_yaml_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(dir) = &self.fixtures {
            config.fixtures_dir = dir.clone();
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if !self.program_args.is_empty() {
            config.program_args = self.program_args.clone();
        }
        if let Some(marker) = &self.input_marker {
            config.input_marker = marker.clone();
        }
        if let Some(marker) = &self.output_marker {
            config.output_marker = marker.clone();
        }
        if let Some(ext) = &self.input_extension {
            config.input_extension = ext.clone();
        }
        if let Some(ext) = &self.expected_extension {
            config.expected_extension = ext.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(stderr) = self.stderr {
            config.stderr = stderr;
        }

        config.validate()?;
        Ok(config)
    }
}
