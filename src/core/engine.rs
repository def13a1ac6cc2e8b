//! Enforcement decisions.
//!
//! [`Engine::decide`] walks a target through exemption, freshness, discovery
//! and (when needed) a test run, recording the outcome in the state store.

use crate::config::Config;
use crate::core::discovery;
use crate::core::runner::{TestExecutor, TestRunner};
use crate::core::state::{TestRun, Violation, ViolationKind, content_hash};
use crate::error::{Error, Result};
use crate::storage::StateBackend;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Why a target skipped enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExemptReason {
    /// The target is itself a test file.
    TestFile,

    /// `require_test_before_run` is off.
    Disabled,

    /// The target matched this `excluded_files` pattern.
    Excluded(String),
}

/// Outcome of one enforcement decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Enforcement skipped; allowed without touching state.
    Exempt(ExemptReason),

    /// Recorded result is current; allowed without running tests.
    Fresh,

    /// Strict mode found no test file; denied.
    NoTests {
        /// Test filenames that would have been picked up.
        expected: Vec<String>,
    },

    /// Tests ran and passed; allowed.
    Passed {
        /// Test files that ran; empty for a whole-suite run.
        tests: Vec<PathBuf>,
    },

    /// Tests ran and failed; denied.
    Failed {
        /// Test files that ran; empty for a whole-suite run.
        tests: Vec<PathBuf>,
    },

    /// A run was needed but no configured runner is installed; denied.
    RunnerUnavailable {
        /// Commands that were tried.
        tried: Vec<String>,
    },
}

impl Decision {
    /// Whether execution may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(
            self,
            Decision::Exempt(_) | Decision::Fresh | Decision::Passed { .. }
        )
    }

    /// The error describing a denial of `path`, or `None` when allowed.
    #[must_use]
    pub fn denial(&self, path: &Path) -> Option<Error> {
        match self {
            Decision::Exempt(_) | Decision::Fresh | Decision::Passed { .. } => None,
            Decision::NoTests { expected } => Some(Error::NoTestsFound {
                path: path.to_path_buf(),
                expected: expected.clone(),
            }),
            Decision::Failed { .. } => Some(Error::TestExecutionFailure {
                path: path.to_path_buf(),
            }),
            Decision::RunnerUnavailable { tried } => Some(Error::RunnerUnavailable {
                tried: tried.clone(),
            }),
        }
    }
}

/// The decision engine, borrowing its collaborators.
pub struct Engine<'a> {
    config: &'a Config,
    store: &'a dyn StateBackend,
    runner: &'a TestRunner,
    executor: &'a dyn TestExecutor,
}

impl<'a> Engine<'a> {
    /// Create an engine.
    #[must_use]
    pub fn new(
        config: &'a Config,
        store: &'a dyn StateBackend,
        runner: &'a TestRunner,
        executor: &'a dyn TestExecutor,
    ) -> Self {
        Self {
            config,
            store,
            runner,
            executor,
        }
    }

    /// Decide whether `path` may run now.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be read or the state store fails.
    pub fn decide(&self, path: &Path) -> Result<Decision> {
        self.decide_at(path, Utc::now())
    }

    /// Decide whether `path` may run, treating `now` as the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be read or the state store fails.
    pub fn decide_at(&self, path: &Path, now: DateTime<Utc>) -> Result<Decision> {
        if let Some(reason) = self.exemption(path) {
            debug!(path = %path.display(), ?reason, "exempt from enforcement");
            return Ok(Decision::Exempt(reason));
        }

        let key = state_key(path);
        let hash = content_hash(path).map_err(|source| Error::TargetUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let state = self.store.load()?;
        if state
            .file(&key)
            .is_some_and(|file| file.is_fresh(&hash, now, self.freshness_window()))
        {
            debug!(path = %key, "tests are fresh");
            return Ok(Decision::Fresh);
        }

        let tests = discovery::find_related_tests(path);
        if tests.is_empty() && self.config.strict_mode {
            debug!(path = %key, "no related tests in strict mode");
            self.record_violation(ViolationKind::NoTestFound, &key, now)?;
            return Ok(Decision::NoTests {
                expected: discovery::expected_test_names(path),
            });
        }

        let Some(command) = self.runner.find_command() else {
            self.record_violation(ViolationKind::RunnerUnavailable, &key, now)?;
            return Ok(Decision::RunnerUnavailable {
                tried: self.runner.candidates(),
            });
        };

        let outcome = self.runner.run(self.executor, command, &tests);
        info!(
            path = %key,
            tests = tests.len(),
            passed = outcome.passed,
            duration_ms = outcome.duration_ms,
            "test run finished"
        );

        let test_keys: Vec<String> = tests.iter().map(|t| state_key(t)).collect();
        let run = TestRun {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            target: key.clone(),
            tests: test_keys.clone(),
            command: command.to_string(),
            passed: outcome.passed,
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            timed_out: outcome.timed_out,
        };
        let limit = self.config.history_limit;
        let related = BTreeSet::from([key.clone()]);

        self.store.update(&mut |state| {
            if outcome.passed {
                state.put_file(&key, &hash, Some(now), true);
            } else {
                // Keep the last success; only a passing run moves it
                let previous = state.file(&key).and_then(|file| file.last_tested);
                state.put_file(&key, &hash, previous, false);
            }
            for test in &test_keys {
                state.put_test(test, outcome.passed, related.clone(), now);
            }
            state.record_run(run.clone(), limit);
            if !outcome.passed {
                state.record_violation(
                    Violation {
                        timestamp: now,
                        kind: ViolationKind::TestFailed,
                        target: key.clone(),
                    },
                    limit,
                );
            }
        })?;

        Ok(if outcome.passed {
            Decision::Passed { tests }
        } else {
            Decision::Failed { tests }
        })
    }

    /// Record `path`'s current content as tested and passing.
    ///
    /// Used after a successful commit, whose hook already vetted the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the state store fails.
    pub fn record_passed(&self, path: &Path) -> Result<()> {
        self.record_passed_at(path, Utc::now())
    }

    /// [`Engine::record_passed`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the state store fails.
    pub fn record_passed_at(&self, path: &Path, now: DateTime<Utc>) -> Result<()> {
        let key = state_key(path);
        let hash = content_hash(path).map_err(|source| Error::TargetUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        self.store
            .update(&mut |state| state.put_file(&key, &hash, Some(now), true))?;
        debug!(path = %key, "recorded as passing");
        Ok(())
    }

    fn record_violation(&self, kind: ViolationKind, key: &str, now: DateTime<Utc>) -> Result<()> {
        let violation = Violation {
            timestamp: now,
            kind,
            target: key.to_string(),
        };
        let limit = self.config.history_limit;
        self.store
            .update(&mut |state| state.record_violation(violation.clone(), limit))?;
        Ok(())
    }

    fn exemption(&self, path: &Path) -> Option<ExemptReason> {
        if discovery::is_test_file(path, &self.config.test_patterns) {
            return Some(ExemptReason::TestFile);
        }
        if !self.config.require_test_before_run {
            return Some(ExemptReason::Disabled);
        }
        discovery::matching_pattern(path, &self.config.excluded_files)
            .map(|pattern| ExemptReason::Excluded(pattern.to_string()))
    }

    fn freshness_window(&self) -> Duration {
        Duration::minutes(i64::from(self.config.test_timeout_minutes))
    }
}

/// Key a path is stored under: canonical when it exists, as given otherwise.
#[must_use]
pub fn state_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
