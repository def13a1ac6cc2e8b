//! Error types for tdd-gate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tdd-gate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tdd-gate operations.
///
/// Every variant renders as a single line; `main` prints it and exits non-zero.
#[derive(Debug, Error)]
pub enum Error {
    /// State store could not be read or written.
    #[error("state store I/O error: {0}")]
    StateIo(#[from] io::Error),

    /// State store contents could not be (de)serialized.
    #[error("state store is unreadable: {0}")]
    Serde(#[from] serde_json::Error),

    /// Malformed configuration override.
    #[error("configuration error: {0}")]
    Config(String),

    /// None of the configured test commands is installed.
    #[error("no test runner available; install one of: {}", .tried.join(", "))]
    RunnerUnavailable {
        /// Commands that were tried, in priority order.
        tried: Vec<String>,
    },

    /// Strict mode found no test file for the target.
    #[error("no tests found for {}; write one of: {}", .path.display(), .expected.join(", "))]
    NoTestsFound {
        /// File that was to be executed.
        path: PathBuf,
        /// Test filenames that would have been picked up.
        expected: Vec<String>,
    },

    /// The test runner exited non-zero.
    #[error("tests failed for {}; fix the failing tests before running it", .path.display())]
    TestExecutionFailure {
        /// File that was to be executed.
        path: PathBuf,
    },

    /// The target file could not be hashed.
    #[error("cannot read {}: {source}", .path.display())]
    TargetUnreadable {
        /// File that was to be executed.
        path: PathBuf,
        /// Underlying read error.
        #[source]
        source: io::Error,
    },

    /// Interactive interpreter requested while `allow_repl` is off.
    #[error("interactive interpreter is disabled (allow_repl = false); pass a script to run")]
    ReplDisabled,

    /// The interpreter or a collaborator could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// The external uninstaller is not where it should be.
    #[error("uninstaller not found at {}", .0.display())]
    UninstallerMissing(PathBuf),

    /// Pre-commit hook denied at least one staged file.
    #[error("commit blocked: {0} file(s) failed TDD checks")]
    CommitBlocked(usize),

    /// A git query failed.
    #[error("git error: {0}")]
    Git(String),
}
