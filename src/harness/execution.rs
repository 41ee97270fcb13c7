//! Running the program under test.
//!
//! The runner only depends on the [`Executor`] trait, so tests can swap the real
//! subprocess for a closure that writes whatever output a scenario needs.

use std::fs::{self, File};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use crate::config::HarnessConfig;
use crate::errors::CaseError;

/// What happens to the standard error of the program under test.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StderrMode {
    /// Passed through to the harness's own stderr.
    #[default]
    Inherit,
    Discard,
}

impl StderrMode {
    fn stdio(self) -> Stdio {
        match self {
            StderrMode::Inherit => Stdio::inherit(),
            StderrMode::Discard => Stdio::null(),
        }
    }
}

/// Facts about a finished invocation. None of them decide the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Produces the actual-output artifact for one input fixture.
pub trait Executor: Send + Sync {
    fn execute(&self, input: &Path, actual: &Path) -> Result<Execution, CaseError>;
}

impl<F> Executor for F
where
    F: Fn(&Path, &Path) -> Result<Execution, CaseError> + Send + Sync,
{
    fn execute(&self, input: &Path, actual: &Path) -> Result<Execution, CaseError> {
        self(input, actual)
    }
}

/// Runs `<program> [args...] <input>` with stdout redirected into the artifact.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    stderr: StderrMode,
}

impl SubprocessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            stderr: StderrMode::default(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.program)
            .with_args(config.program_args.clone())
            .with_timeout(config.timeout())
            .with_stderr(config.stderr)
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Executor for SubprocessExecutor {
    fn execute(&self, input: &Path, actual: &Path) -> Result<Execution, CaseError> {
        let started = Instant::now();

        if let Some(dir) = actual.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| CaseError::io(dir, e))?;
        }
        // Truncates output left over from a previous run.
        let artifact = File::create(actual).map_err(|e| CaseError::io(actual, e))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::from(artifact))
            .stderr(self.stderr.stdio());
        // Own process group, so a timeout reaches everything the program spawned.
        #[cfg(unix)]
        command.process_group(0);

        tracing::debug!(program = %self.program.display(), input = %input.display(), "spawning");
        let mut child = command.spawn().map_err(|source| CaseError::Launch {
            program: self.program.clone(),
            source,
        })?;
        drop(command);

        let status = match self.timeout {
            Some(limit) => {
                match child
                    .wait_timeout(limit)
                    .map_err(|e| CaseError::io(&self.program, e))?
                {
                    Some(status) => status,
                    None => {
                        tracing::warn!(input = %input.display(), ?limit, "killing program under test");
                        kill_tree(&mut child);
                        return Err(CaseError::TimedOut { after: limit });
                    }
                }
            }
            None => child.wait().map_err(|e| CaseError::io(&self.program, e))?,
        };

        let execution = Execution {
            exit_code: status.code(),
            elapsed: started.elapsed(),
        };
        tracing::debug!(exit_code = ?execution.exit_code, elapsed = ?execution.elapsed, "program exited");
        Ok(execution)
    }
}

/// Kills the child's process group (the child alone off unix) and reaps the child.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let group = Pid::from_raw(child.id() as i32);
        if let Err(errno) = killpg(group, Signal::SIGKILL) {
            tracing::warn!(pid = child.id(), %errno, "killpg failed, killing child only");
            if let Err(e) = child.kill() {
                tracing::warn!(pid = child.id(), error = %e, "kill failed");
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = child.kill() {
            tracing::warn!(pid = child.id(), error = %e, "kill failed");
        }
    }

    if let Err(e) = child.wait() {
        tracing::warn!(pid = child.id(), error = %e, "timed-out program was not reaped");
    }
}
