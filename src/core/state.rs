//! Persistent enforcement state types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

/// Everything the state store remembers between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per source file records, keyed by path.
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,

    /// Per test file records, keyed by path.
    #[serde(default)]
    pub tests: BTreeMap<String, TestState>,

    /// Recent test runs, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<TestRun>,

    /// Recent denials, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl State {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for a source file.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileState> {
        self.files.get(path)
    }

    /// Create or overwrite the record for a source file.
    pub fn put_file(
        &mut self,
        path: &str,
        hash: &str,
        last_tested: Option<DateTime<Utc>>,
        test_passed: bool,
    ) {
        self.files.insert(
            path.to_string(),
            FileState {
                hash: hash.to_string(),
                last_tested,
                test_passed,
            },
        );
    }

    /// Get the record for a test file.
    #[must_use]
    pub fn test(&self, path: &str) -> Option<&TestState> {
        self.tests.get(path)
    }

    /// Create or overwrite the record for a test file.
    pub fn put_test(
        &mut self,
        path: &str,
        passed: bool,
        related_files: BTreeSet<String>,
        now: DateTime<Utc>,
    ) {
        self.tests.insert(
            path.to_string(),
            TestState {
                last_run: now,
                passed,
                related_files,
            },
        );
    }

    /// Append a run to history, dropping the oldest beyond `limit`.
    pub fn record_run(&mut self, run: TestRun, limit: usize) {
        self.runs.push(run);
        if self.runs.len() > limit {
            let excess = self.runs.len() - limit;
            self.runs.drain(..excess);
        }
    }

    /// Append a denial, dropping the oldest beyond `limit`.
    pub fn record_violation(&mut self, violation: Violation, limit: usize) {
        self.violations.push(violation);
        if self.violations.len() > limit {
            let excess = self.violations.len() - limit;
            self.violations.drain(..excess);
        }
    }

    /// Number of recorded denials per kind.
    #[must_use]
    pub fn violation_summary(&self) -> BTreeMap<ViolationKind, usize> {
        let mut summary = BTreeMap::new();
        for violation in &self.violations {
            *summary.entry(violation.kind).or_insert(0) += 1;
        }
        summary
    }
}

/// Tested status of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// SHA-256 of the content when last evaluated.
    pub hash: String,

    /// Last successful test run; `None` if never tested successfully.
    pub last_tested: Option<DateTime<Utc>>,

    /// Whether the last evaluation passed.
    pub test_passed: bool,
}

impl FileState {
    /// Whether tests need not re-run for content hashing to `current_hash`.
    ///
    /// Requires an identical hash, a passing result, and a last success no
    /// older than `window`.
    #[must_use]
    pub fn is_fresh(&self, current_hash: &str, now: DateTime<Utc>, window: Duration) -> bool {
        self.hash == current_hash
            && self.test_passed
            && self
                .last_tested
                .is_some_and(|tested| now.signed_duration_since(tested) <= window)
    }
}

/// Result of the last run of one test file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestState {
    /// When the test file was last run.
    pub last_run: DateTime<Utc>,

    /// Whether that run passed.
    pub passed: bool,

    /// Source files the run was attributed to.
    #[serde(default)]
    pub related_files: BTreeSet<String>,
}

/// One executed test command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    /// Unique run identifier.
    pub id: String,

    /// When the run finished.
    pub timestamp: DateTime<Utc>,

    /// Source file the run was made for.
    pub target: String,

    /// Test files passed to the runner; empty for a whole-suite run.
    #[serde(default)]
    pub tests: Vec<String>,

    /// Runner command line, without target paths.
    pub command: String,

    /// Whether the runner exited zero.
    pub passed: bool,

    /// Runner exit code, absent when killed or never started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Wall-clock duration.
    pub duration_ms: u64,

    /// Whether the run was killed by `test_run_timeout_seconds`.
    #[serde(default)]
    pub timed_out: bool,
}

/// Why an invocation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Strict mode found no related test file.
    NoTestFound,

    /// The related tests failed.
    TestFailed,

    /// No configured test runner is installed.
    RunnerUnavailable,
}

impl ViolationKind {
    /// Stable name, as serialized.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::NoTestFound => "no_test_found",
            ViolationKind::TestFailed => "test_failed",
            ViolationKind::RunnerUnavailable => "runner_unavailable",
        }
    }
}

/// One denied invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// When the denial happened.
    pub timestamp: DateTime<Utc>,

    /// What kind of denial it was.
    pub kind: ViolationKind,

    /// Source file that was refused.
    pub target: String,
}

/// SHA-256 hex digest of a file's content.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
