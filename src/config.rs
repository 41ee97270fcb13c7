//! Harness configuration.
//!
//! Settings come from three layers, lowest precedence first: built-in defaults,
//! an optional YAML file, and explicitly supplied command-line flags. The CLI
//! performs the last merge; this module owns the defaults, the YAML loader and
//! validation.
//!
//! ```yaml
//! fixtures_dir: testcases/phase2
//! output_dir: output
//! program: ./mypython.exe
//! program_args: []
//! input_marker: in
//! output_marker: out
//! input_extension: py
//! expected_extension: txt
//! jobs: 1
//! timeout_secs: 10
//! stderr: inherit
//! ```

use std::path::{Component, Path, PathBuf};
use std::{env, fs};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{HarnessError, HarnessResult};
use crate::harness::execution::StderrMode;
use crate::harness::paths::NamingScheme;

pub const DEFAULT_FIXTURES_DIR: &str = "testcases/phase2";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_PROGRAM: &str = "./mypython.exe";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub fixtures_dir: PathBuf,
    pub output_dir: PathBuf,
    pub program: PathBuf,
    /// Arguments passed before the input fixture path.
    pub program_args: Vec<String>,
    pub input_marker: String,
    pub output_marker: String,
    pub input_extension: String,
    pub expected_extension: String,
    /// Worker count. `0` resolves to the number of available CPUs.
    pub jobs: usize,
    /// Per-case timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,
    /// Only cases whose identifier contains this substring are run.
    pub filter: Option<String>,
    pub stderr: StderrMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let naming = NamingScheme::default();
        Self {
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            program: PathBuf::from(DEFAULT_PROGRAM),
            program_args: Vec::new(),
            input_marker: naming.input_marker,
            output_marker: naming.output_marker,
            input_extension: naming.input_extension,
            expected_extension: naming.expected_extension,
            jobs: 1,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            filter: None,
            stderr: StderrMode::default(),
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> HarnessResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    pub fn naming(&self) -> NamingScheme {
        NamingScheme {
            input_marker: self.input_marker.clone(),
            output_marker: self.output_marker.clone(),
            input_extension: self.input_extension.clone(),
            expected_extension: self.expected_extension.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn worker_count(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Rejects settings that would make identifiers or artifact paths ambiguous.
    pub fn validate(&self) -> HarnessResult<()> {
        let parts = [
            ("input marker", &self.input_marker),
            ("output marker", &self.output_marker),
            ("input extension", &self.input_extension),
            ("expected extension", &self.expected_extension),
        ];
        for (what, value) in parts {
            if value.is_empty() {
                return Err(HarnessError::config(format!("{what} must not be empty")));
            }
            if value.contains(['/', '\\']) {
                return Err(HarnessError::config(format!(
                    "{what} '{value}' must not contain a path separator"
                )));
            }
        }
        if self.input_marker.contains('.') {
            return Err(HarnessError::config(format!(
                "input marker '{}' must not contain '.'",
                self.input_marker
            )));
        }
        if self.input_extension.starts_with('.') || self.expected_extension.starts_with('.') {
            return Err(HarnessError::config(
                "extensions are given without a leading '.'",
            ));
        }
        if self.input_marker == self.output_marker
            && self.input_extension == self.expected_extension
        {
            return Err(HarnessError::config(
                "expected-output files would overwrite input fixtures: \
                 markers and extensions are identical",
            ));
        }
        if self.program.as_os_str().is_empty() {
            return Err(HarnessError::config("program under test must be set"));
        }
        if same_directory(&self.fixtures_dir, &self.output_dir) {
            return Err(HarnessError::config(format!(
                "output directory '{}' is the fixture directory: \
                 actual output would overwrite expected files",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

/// Resolves links when the directory exists, otherwise compares `.`-free absolute paths.
fn same_directory(a: &Path, b: &Path) -> bool {
    comparable(a) == comparable(b)
}

fn comparable(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path) {
        return real;
    }
    let absolute = match env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
