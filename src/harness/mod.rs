//! # Golden-file harness
//!
//! Each test case moves through four stages exactly once:
//!
//! 1. **Discovery** ([`discovery`]): list the fixture directory and pick out
//!    `<input-marker><id>.<input-ext>` files.
//! 2. **Path resolution** ([`paths`]): derive the actual-output path in the output
//!    directory and the expected-output path next to the input.
//! 3. **Execution** ([`execution`]): run `<program> <input>` with stdout redirected
//!    into the actual-output file.
//! 4. **Comparison** ([`comparison`]): compare actual and expected as line
//!    sequences and produce a [`Verdict`].
//!
//! [`Harness`] wires the stages together; [`report`] renders the result.
//!
//! ```rust,no_run
//! use goldcheck::config::HarnessConfig;
//! use goldcheck::harness::Harness;
//!
//! let harness = Harness::new(HarnessConfig::default())?;
//! let summary = harness.run()?;
//! std::process::exit(summary.status().exit_code());
//! # Ok::<(), goldcheck::HarnessError>(())
//! ```

pub mod comparison;
pub mod discovery;
pub mod execution;
pub mod paths;
pub mod report;
pub mod runner;

pub use comparison::{Comparison, Mismatch};
pub use discovery::{discover, Discovery, Fixture, RejectedFixture};
pub use execution::{Execution, Executor, StderrMode, SubprocessExecutor};
pub use paths::{resolve, ArtifactPaths, NamingScheme, TestId};
pub use report::{CaseReport, FailureReason, RunStatus, RunSummary, Verdict};
pub use runner::{run_case, run_cases, Harness, TestCase};
