//! Test runner selection and execution.
//!
//! Runners are tried in configured priority order; the first whose program is
//! installed wins. Exit code 0 is the only success signal.

use crate::config::Config;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use wait_timeout::ChildExt;

/// A test runner invocation such as `python -m pytest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    /// Program to execute, checked for availability.
    pub program: String,

    /// Fixed arguments placed before any target paths.
    pub args: Vec<String>,
}

impl RunnerCommand {
    /// Split a configured command line on whitespace.
    ///
    /// Returns `None` for blank entries.
    #[must_use]
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(ToString::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a spawned test process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// Exit code, absent when killed by a signal or the timeout.
    pub exit_code: Option<i32>,

    /// Whether the process was killed for exceeding the timeout.
    pub timed_out: bool,
}

/// Seam for spawning test processes.
pub trait TestExecutor {
    /// Run `program` with `args` to completion, or until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn execute(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> io::Result<Execution>;
}

/// Executor that spawns real processes with inherited stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl TestExecutor for ProcessExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[OsString],
        timeout: Option<Duration>,
    ) -> io::Result<Execution> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()?;

        let Some(limit) = timeout else {
            let status = child.wait()?;
            return Ok(Execution {
                exit_code: status.code(),
                timed_out: false,
            });
        };

        match child.wait_timeout(limit)? {
            Some(status) => Ok(Execution {
                exit_code: status.code(),
                timed_out: false,
            }),
            None => {
                warn!(program, ?limit, "test run exceeded timeout, killing it");
                child.kill()?;
                child.wait()?;
                Ok(Execution {
                    exit_code: None,
                    timed_out: true,
                })
            }
        }
    }
}

/// Result of one test run as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Whether the runner exited zero in time.
    pub passed: bool,

    /// Runner exit code, if it exited normally.
    pub exit_code: Option<i32>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the run hit `test_run_timeout_seconds`.
    pub timed_out: bool,
}

/// Availability predicate for a runner's program.
pub type Availability = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Ranked runner descriptors plus an availability predicate.
pub struct TestRunner {
    commands: Vec<RunnerCommand>,
    is_available: Availability,
    timeout: Option<Duration>,
}

impl fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRunner")
            .field("commands", &self.commands)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TestRunner {
    /// Build a runner that looks up each command's program on `PATH`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_availability(config, is_installed)
    }

    /// Build a runner with a custom availability predicate.
    #[must_use]
    pub fn with_availability(
        config: &Config,
        is_available: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            commands: config
                .test_commands
                .iter()
                .filter_map(|c| RunnerCommand::parse(c))
                .collect(),
            is_available: Box::new(is_available),
            timeout: config.test_run_timeout_seconds.map(Duration::from_secs),
        }
    }

    /// First configured command whose program is available.
    #[must_use]
    pub fn find_command(&self) -> Option<&RunnerCommand> {
        self.commands.iter().find(|c| (self.is_available)(c.program.as_str()))
    }

    /// All configured commands, for error messages.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        self.commands.iter().map(ToString::to_string).collect()
    }

    /// Run `command` against `targets`, or the whole suite when empty.
    ///
    /// Never fails: a runner that cannot be spawned counts as a failed run.
    pub fn run(
        &self,
        executor: &dyn TestExecutor,
        command: &RunnerCommand,
        targets: &[PathBuf],
    ) -> RunOutcome {
        let mut args: Vec<OsString> = command.args.iter().map(OsString::from).collect();
        args.extend(targets.iter().map(|t| t.as_os_str().to_os_string()));

        info!(command = %command, targets = targets.len(), "running tests");
        let started = Instant::now();
        let execution = executor.execute(&command.program, &args, self.timeout);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match execution {
            Ok(execution) => RunOutcome {
                passed: execution.exit_code == Some(0) && !execution.timed_out,
                exit_code: execution.exit_code,
                duration_ms,
                timed_out: execution.timed_out,
            },
            Err(e) => {
                warn!(command = %command, "test runner failed to start: {e}");
                RunOutcome {
                    passed: false,
                    exit_code: None,
                    duration_ms,
                    timed_out: false,
                }
            }
        }
    }
}

/// Whether `program` resolves on `PATH`.
#[must_use]
pub fn is_installed(program: &str) -> bool {
    which::which(program).is_ok()
}
