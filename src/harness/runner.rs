use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::HarnessConfig;
use crate::errors::{HarnessError, HarnessResult};
use crate::harness::comparison::{self, Comparison};
use crate::harness::discovery::{self, Fixture};
use crate::harness::execution::{Executor, SubprocessExecutor};
use crate::harness::paths::{self, ArtifactPaths, NamingScheme, TestId};
use crate::harness::report::{CaseReport, FailureReason, RunSummary, Verdict};

/// A discovered case with all of its artifact paths resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: TestId,
    pub input: PathBuf,
    pub paths: ArtifactPaths,
}

impl TestCase {
    pub fn from_fixture(fixture: Fixture, output_dir: &Path, naming: &NamingScheme) -> Self {
        let paths = paths::resolve(&fixture.id, &fixture.input, output_dir, naming);
        Self {
            id: fixture.id,
            input: fixture.input,
            paths,
        }
    }
}

/// Executes one case and judges its output. Never fails: every error becomes a verdict.
pub fn run_case(case: &TestCase, executor: &dyn Executor) -> CaseReport {
    let span = tracing::debug_span!("case", id = %case.id);
    let _guard = span.enter();
    let started = Instant::now();

    if case.paths.actual == case.paths.expected {
        tracing::error!(path = %case.paths.expected.display(), "actual output would overwrite expected output");
        return CaseReport {
            id: case.id.clone(),
            input: case.input.clone(),
            paths: case.paths.clone(),
            verdict: Verdict::Failed(FailureReason::Io {
                message: format!(
                    "{}: actual and expected output share one path",
                    case.paths.expected.display()
                ),
            }),
            exit_code: None,
            elapsed: started.elapsed(),
        };
    }

    let (verdict, exit_code) = match executor.execute(&case.input, &case.paths.actual) {
        Err(err) => (Verdict::Failed(err.into()), None),
        Ok(execution) => {
            let verdict = match comparison::compare_files(&case.paths.actual, &case.paths.expected)
            {
                Ok(Comparison::Equal) => Verdict::Passed,
                Ok(Comparison::Differ(mismatch)) => {
                    Verdict::Failed(FailureReason::Mismatch(mismatch))
                }
                Err(err) => Verdict::Failed(err.into()),
            };
            (verdict, execution.exit_code)
        }
    };
    tracing::debug!(verdict = verdict.label(), "case finished");

    CaseReport {
        id: case.id.clone(),
        input: case.input.clone(),
        paths: case.paths.clone(),
        verdict,
        exit_code,
        elapsed: started.elapsed(),
    }
}

/// Runs every case, on up to `workers` threads, and returns reports sorted by id.
pub fn run_cases(
    cases: &[TestCase],
    executor: &dyn Executor,
    workers: usize,
) -> HarnessResult<Vec<CaseReport>> {
    let mut reports: Vec<CaseReport> = if workers <= 1 || cases.len() <= 1 {
        cases.iter().map(|case| run_case(case, executor)).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("goldcheck-worker-{i}"))
            .build()
            .map_err(|source| HarnessError::Pool { source })?;
        pool.install(|| {
            cases
                .par_iter()
                .map(|case| run_case(case, executor))
                .collect()
        })
    };
    reports.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(reports)
}

/// Discovery, resolution, execution and comparison for one configuration.
pub struct Harness {
    config: HarnessConfig,
    executor: Box<dyn Executor>,
}

impl Harness {
    /// A harness that runs the configured program as a subprocess.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let executor = SubprocessExecutor::from_config(&config);
        Self::with_executor(config, executor)
    }

    pub fn with_executor(
        config: HarnessConfig,
        executor: impl Executor + 'static,
    ) -> HarnessResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor: Box::new(executor),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Discovers and resolves the cases of this run without executing anything.
    pub fn plan(&self) -> HarnessResult<(Vec<TestCase>, discovery::Discovery)> {
        let naming = self.config.naming();
        let mut found = discovery::discover(&self.config.fixtures_dir, &naming)?;
        let fixtures = std::mem::take(&mut found.fixtures);
        let filter = self.config.filter.as_deref();
        let cases = fixtures
            .into_iter()
            .filter(|f| filter.map_or(true, |needle| f.id.as_str().contains(needle)))
            .map(|f| TestCase::from_fixture(f, &self.config.output_dir, &naming))
            .collect();
        Ok((cases, found))
    }

    pub fn run(&self) -> HarnessResult<RunSummary> {
        let (cases, found) = self.plan()?;
        let workers = self.config.worker_count();
        tracing::info!(
            fixtures_dir = %self.config.fixtures_dir.display(),
            cases = cases.len(),
            workers,
            "starting run"
        );

        let reports = run_cases(&cases, self.executor.as_ref(), workers)?;
        let summary = RunSummary {
            cases: reports,
            rejected: found.rejected,
        };
        tracing::info!(
            passed = summary.passed(),
            failed = summary.failed(),
            "run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::errors::CaseError;
    use crate::harness::execution::Execution;

    /// Pretends to be the interpreter: looks up canned output by input file name.
    fn canned(outputs: &[(&str, &str)]) -> impl Executor + Clone + 'static {
        let outputs: Arc<HashMap<String, String>> = Arc::new(
            outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        move |input: &Path, actual: &Path| -> Result<Execution, CaseError> {
            let name = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let Some(output) = outputs.get(name) else {
                return Err(CaseError::Launch {
                    program: PathBuf::from("fake"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no canned output"),
                });
            };
            if let Some(dir) = actual.parent() {
                fs::create_dir_all(dir).map_err(|e| CaseError::io(dir, e))?;
            }
            fs::write(actual, output).map_err(|e| CaseError::io(actual, e))?;
            Ok(Execution {
                exit_code: Some(0),
                elapsed: Duration::ZERO,
            })
        }
    }

    fn suite(files: &[(&str, &str)]) -> (tempfile::TempDir, HarnessConfig) {
        let root = tempfile::tempdir().unwrap();
        let fixtures = root.path().join("fixtures");
        fs::create_dir(&fixtures).unwrap();
        for (name, content) in files {
            fs::write(fixtures.join(name), content).unwrap();
        }
        let config = HarnessConfig {
            fixtures_dir: fixtures,
            output_dir: root.path().join("output"),
            ..HarnessConfig::default()
        };
        (root, config)
    }

    fn verdicts(summary: &RunSummary) -> Vec<(String, &'static str)> {
        summary
            .cases
            .iter()
            .map(|c| (c.id.to_string(), c.verdict.label()))
            .collect()
    }

    #[test]
    fn matching_output_passes() {
        let (_root, config) = suite(&[("in1.py", ""), ("out1.txt", "x1= 27\nx2= 16\n")]);
        let harness =
            Harness::with_executor(config, canned(&[("in1.py", "x1= 27\nx2= 16\n")])).unwrap();
        let summary = harness.run().unwrap();
        assert_eq!(verdicts(&summary), [("1".to_string(), "passed")]);
    }

    #[test]
    fn differing_and_truncated_output_fail() {
        let (_root, config) = suite(&[
            ("in1.py", ""),
            ("out1.txt", "x1= 27\nx2= 99\n"),
            ("in2.py", ""),
            ("out2.txt", "x1= 27\nx2= 16\nx3= 5\n"),
        ]);
        let exec = canned(&[("in1.py", "x1= 27\nx2= 16\n"), ("in2.py", "x1= 27\nx2= 16\n")]);
        let summary = Harness::with_executor(config, exec).unwrap().run().unwrap();
        assert_eq!(
            verdicts(&summary),
            [("1".to_string(), "failed"), ("2".to_string(), "failed")]
        );
    }

    #[test]
    fn missing_expected_output_is_io_failure() {
        let (_root, config) = suite(&[("in1.py", "")]);
        let summary = Harness::with_executor(config, canned(&[("in1.py", "x\n")]))
            .unwrap()
            .run()
            .unwrap();
        assert!(matches!(
            summary.cases[0].verdict,
            Verdict::Failed(FailureReason::Io { .. })
        ));
    }

    #[test]
    fn expected_output_is_never_overwritten() {
        let (root, _) = suite(&[("in1.py", ""), ("out1.txt", "EXPECTED\n")]);
        let fixtures = root.path().join("fixtures");
        let expected = fixtures.join("out1.txt");
        let case = TestCase {
            id: TestId::new("1"),
            input: fixtures.join("in1.py"),
            paths: ArtifactPaths {
                actual: expected.clone(),
                expected: expected.clone(),
            },
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = canned(&[("in1.py", "WRONG\n")]);
        let counter = Arc::clone(&calls);
        let exec = move |input: &Path, actual: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.execute(input, actual)
        };

        let report = run_case(&case, &exec);
        assert!(matches!(
            report.verdict,
            Verdict::Failed(FailureReason::Io { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(fs::read_to_string(&expected).unwrap(), "EXPECTED\n");
    }

    #[test]
    fn launch_failure_is_isolated() {
        let (_root, config) = suite(&[
            ("in1.py", ""),
            ("out1.txt", "a\n"),
            ("in2.py", ""),
            ("out2.txt", "b\n"),
        ]);
        // No canned output for in1: the fake refuses to "launch" it.
        let summary = Harness::with_executor(config, canned(&[("in2.py", "b\n")]))
            .unwrap()
            .run()
            .unwrap();
        assert!(matches!(
            summary.cases[0].verdict,
            Verdict::Failed(FailureReason::Launch { .. })
        ));
        assert_eq!(summary.cases[1].verdict, Verdict::Passed);
    }

    #[test]
    fn every_case_gets_exactly_one_verdict_in_id_order() {
        let mut files = Vec::new();
        let mut outputs = Vec::new();
        let names: Vec<(String, String)> = (1..=25)
            .map(|i| (format!("in{i}.py"), format!("out{i}.txt")))
            .collect();
        for (input, expected) in &names {
            files.push((input.as_str(), ""));
            files.push((expected.as_str(), "same\n"));
            outputs.push((input.as_str(), "same\n"));
        }
        let (_root, mut config) = suite(&files);
        config.jobs = 4;

        let calls = Arc::new(AtomicUsize::new(0));
        let inner = canned(&outputs);
        let counter = Arc::clone(&calls);
        let exec = move |input: &Path, actual: &Path| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.execute(input, actual)
        };

        let summary = Harness::with_executor(config, exec).unwrap().run().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 25);
        assert_eq!(summary.total(), 25);
        assert_eq!(summary.passed(), 25);
        let ids: Vec<_> = summary.cases.iter().map(|c| c.id.to_string()).collect();
        let expected: Vec<_> = (1..=25).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn runs_are_idempotent() {
        let (_root, config) = suite(&[
            ("in1.py", ""),
            ("out1.txt", "ok\n"),
            ("in2.py", ""),
            ("out2.txt", "nope\n"),
        ]);
        let harness =
            Harness::with_executor(config, canned(&[("in1.py", "ok\n"), ("in2.py", "ok\n")]))
                .unwrap();
        let first = verdicts(&harness.run().unwrap());
        let second = verdicts(&harness.run().unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn one_character_edit_flips_only_that_case() {
        let (_root, config) = suite(&[
            ("in1.py", ""),
            ("out1.txt", "x1= 27\n"),
            ("in2.py", ""),
            ("out2.txt", "y\n"),
        ]);
        let expected_1 = config.fixtures_dir.join("out1.txt");
        let harness =
            Harness::with_executor(config, canned(&[("in1.py", "x1= 27\n"), ("in2.py", "y\n")]))
                .unwrap();
        assert_eq!(harness.run().unwrap().passed(), 2);

        fs::write(&expected_1, "x1= 28\n").unwrap();
        let summary = harness.run().unwrap();
        assert_eq!(
            verdicts(&summary),
            [("1".to_string(), "failed"), ("2".to_string(), "passed")]
        );
    }

    #[test]
    fn filter_limits_cases() {
        let (_root, mut config) = suite(&[("in1.py", ""), ("in12.py", ""), ("in3.py", "")]);
        config.filter = Some("1".into());
        let harness = Harness::with_executor(config, canned(&[])).unwrap();
        let (cases, _) = harness.plan().unwrap();
        let ids: Vec<_> = cases.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, ["1", "12"]);
    }

    #[test]
    fn missing_fixture_directory_aborts() {
        let config = HarnessConfig {
            fixtures_dir: PathBuf::from("definitely/not/here"),
            ..HarnessConfig::default()
        };
        let harness = Harness::with_executor(config, canned(&[])).unwrap();
        assert!(matches!(
            harness.run(),
            Err(HarnessError::Discovery { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = HarnessConfig {
            input_marker: String::new(),
            ..HarnessConfig::default()
        };
        assert!(Harness::with_executor(config, canned(&[])).is_err());
    }
}
