//! Verdicts and their presentation.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::errors::CaseError;
use crate::harness::comparison::{self, Mismatch};
use crate::harness::discovery::RejectedFixture;
use crate::harness::paths::{ArtifactPaths, TestId};

/// Why a case failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Mismatch(Mismatch),
    Launch { message: String },
    Io { message: String },
    TimedOut {
        #[serde(rename = "after_secs", serialize_with = "serialize_secs")]
        after: Duration,
    },
}

impl FailureReason {
    /// Launch and I/O failures point at the harness setup rather than the program's output.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, FailureReason::Launch { .. } | FailureReason::Io { .. })
    }
}

impl From<CaseError> for FailureReason {
    fn from(err: CaseError) -> Self {
        match err {
            CaseError::Launch { .. } => FailureReason::Launch {
                message: err.to_string(),
            },
            CaseError::Io { .. } => FailureReason::Io {
                message: err.to_string(),
            },
            CaseError::TimedOut { after } => FailureReason::TimedOut { after },
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Mismatch(m) => write!(
                f,
                "mismatch at line {} (expected {} lines, got {})",
                m.line, m.expected_lines, m.actual_lines
            ),
            FailureReason::Launch { message } => write!(f, "launch error: {message}"),
            FailureReason::Io { message } => write!(f, "i/o error: {message}"),
            FailureReason::TimedOut { after } => {
                write!(f, "timed out after {}s", after.as_secs_f64())
            }
        }
    }
}

/// Outcome of one case. Exactly one per discovered fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed(FailureReason),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    pub id: TestId,
    pub input: PathBuf,
    #[serde(flatten)]
    pub paths: ArtifactPaths,
    pub verdict: Verdict,
    /// Informational only.
    pub exit_code: Option<i32>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Process exit codes of the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    AllPassed,
    TestFailures,
    InfrastructureError,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::AllPassed => 0,
            RunStatus::TestFailures => 1,
            RunStatus::InfrastructureError => 2,
        }
    }
}

/// Everything one run produced, ordered by [`TestId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cases: Vec<CaseReport>,
    pub rejected: Vec<RejectedFixture>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn passed(&self) -> usize {
        self.cases.iter().filter(|c| c.verdict.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn infrastructure_errors(&self) -> usize {
        self.cases
            .iter()
            .filter(|c| matches!(&c.verdict, Verdict::Failed(r) if r.is_infrastructure()))
            .count()
    }

    pub fn status(&self) -> RunStatus {
        if self.infrastructure_errors() > 0 {
            RunStatus::InfrastructureError
        } else if self.failed() > 0 {
            RunStatus::TestFailures
        } else {
            RunStatus::AllPassed
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            status: RunStatus,
            exit_code: i32,
            total: usize,
            passed: usize,
            failed: usize,
            infrastructure_errors: usize,
            #[serde(flatten)]
            summary: &'a RunSummary,
        }
        let status = self.status();
        serde_json::to_string_pretty(&Document {
            status,
            exit_code: status.exit_code(),
            total: self.total(),
            passed: self.passed(),
            failed: self.failed(),
            infrastructure_errors: self.infrastructure_errors(),
            summary: self,
        })
    }
}

// ============================================================================
// TEXT REPORT
// ============================================================================

/// Options for the human-readable report.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    pub show_diff: bool,
}

/// Writes `Test <id> <passed|failed>.` per case to `out`; failure details and the
/// closing summary go to `err`.
pub fn write_text(
    summary: &RunSummary,
    options: TextOptions,
    out: &mut dyn WriteColor,
    err: &mut dyn WriteColor,
) -> io::Result<()> {
    for rejected in &summary.rejected {
        err.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        write!(err, "skipped")?;
        err.reset()?;
        writeln!(err, " {}: {}", rejected.path.display(), rejected.reason)?;
    }

    for case in &summary.cases {
        write_case_line(case, out)?;
        if let Verdict::Failed(reason) = &case.verdict {
            out.flush()?;
            writeln!(err, "  {reason}")?;
            if options.show_diff && matches!(reason, FailureReason::Mismatch(_)) {
                write_diff(&case.paths, err)?;
            }
        }
    }

    out.flush()?;

    writeln!(err)?;
    write!(err, "Test summary: total {}, ", summary.total())?;
    write_colored(err, "passed", Color::Green)?;
    write!(err, " {}, ", summary.passed())?;
    write_colored(err, "failed", Color::Red)?;
    writeln!(err, " {}", summary.failed())?;
    err.flush()
}

fn write_case_line(case: &CaseReport, out: &mut dyn WriteColor) -> io::Result<()> {
    let color = if case.verdict.passed() {
        Color::Green
    } else {
        Color::Red
    };
    write!(out, "Test {} ", case.id)?;
    write_colored(out, case.verdict.label(), color)?;
    writeln!(out, ".")
}

fn write_colored(out: &mut dyn WriteColor, text: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{text}")?;
    out.reset()
}

fn write_diff(paths: &ArtifactPaths, err: &mut dyn WriteColor) -> io::Result<()> {
    let (Some(expected), Some(actual)) = (
        comparison::display_text(&paths.expected),
        comparison::display_text(&paths.actual),
    ) else {
        return Ok(());
    };
    writeln!(err, "  --- {}", paths.expected.display())?;
    writeln!(err, "  +++ {}", paths.actual.display())?;
    let changeset = Changeset::new(&expected, &actual, "\n");
    for diff in &changeset.diffs {
        let (sign, color, text) = match diff {
            Difference::Same(x) => (' ', None, x),
            Difference::Rem(x) => ('-', Some(Color::Red), x),
            Difference::Add(x) => ('+', Some(Color::Green), x),
        };
        err.set_color(ColorSpec::new().set_fg(color))?;
        for line in text.split('\n') {
            writeln!(err, "  {sign}{line}")?;
        }
        err.reset()?;
    }
    Ok(())
}
