//! Error types for the goldcheck harness.
//!
//! Errors are split by blast radius:
//!
//! - [`HarnessError`] aborts the whole run. It is rendered through `miette` by the
//!   CLI and maps to the infrastructure exit code.
//! - [`CaseError`] is local to a single test case. The runner converts it into a
//!   failed verdict with a distinct reason and moves on to the next case.
//!
//! A content mismatch is not an error at all; it is an ordinary verdict.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for run-level operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

// ============================================================================
// RUN-FATAL ERRORS
// ============================================================================

/// Errors that abort the run before any report is produced.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("Cannot read fixture directory '{}'", dir.display())]
    #[diagnostic(
        code(goldcheck::discovery),
        help("check that --fixtures points at an existing, readable directory")
    )]
    Discovery {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(goldcheck::config))]
    Config { message: String },

    #[error("Cannot load configuration file '{}'", path.display())]
    #[diagnostic(
        code(goldcheck::config_file),
        help("the configuration file must be a YAML mapping of harness settings")
    )]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Cannot write report")]
    #[diagnostic(code(goldcheck::report))]
    Report {
        #[source]
        source: io::Error,
    },

    #[error("Cannot start worker pool")]
    #[diagnostic(code(goldcheck::pool))]
    Pool {
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

impl HarnessError {
    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// PER-CASE ERRORS
// ============================================================================

/// Errors confined to one test case.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("failed to launch '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out after {}s", after.as_secs_f64())]
    TimedOut { after: Duration },
}

impl CaseError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CaseError::Io {
            path: path.into(),
            source,
        }
    }
}
