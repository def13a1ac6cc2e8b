//! `tdd-gate --hook` command implementation.
//!
//! Git hooks call in here: pre-commit gates every staged source file,
//! post-commit records every committed source file as tested.

use crate::cli::{current_config, open_store};
use crate::config::Config;
use crate::core::{Engine, ProcessExecutor, TestRunner};
use crate::error::{Error, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Git hook being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookKind {
    /// Before a commit is created.
    PreCommit,

    /// After a commit succeeded.
    PostCommit,
}

/// Run a hook.
///
/// # Errors
///
/// Returns [`Error::CommitBlocked`] when pre-commit denies a staged file,
/// [`Error::Git`] when git cannot be queried, or a state failure.
pub fn run(kind: HookKind) -> Result<()> {
    let config = current_config()?;
    if kind == HookKind::PreCommit && !config.require_test_before_commit {
        debug!("commit enforcement disabled");
        return Ok(());
    }

    // The commit switch governs here, not the run switch
    let config = Config {
        require_test_before_run: true,
        ..config
    };
    let store = open_store(&config)?;
    let runner = TestRunner::from_config(&config);
    let executor = ProcessExecutor;
    let engine = Engine::new(&config, &store, &runner, &executor);

    let root = repo_root()?;
    match kind {
        HookKind::PreCommit => {
            let staged = git_lines(&["diff", "--cached", "--name-only", "--diff-filter=ACM"])?;
            pre_commit(&engine, &source_files(&root, &staged, &config.source_extensions))
        }
        HookKind::PostCommit => {
            let committed = git_lines(&[
                "diff-tree",
                "--no-commit-id",
                "--name-only",
                "-r",
                "HEAD",
            ])?;
            let files = source_files(&root, &committed, &config.source_extensions);
            let recorded = post_commit(&engine, &files)?;
            debug!(recorded, "post-commit recorded files");
            Ok(())
        }
    }
}

/// Decide every file, printing each denial.
///
/// # Errors
///
/// Returns [`Error::CommitBlocked`] with the number of denied files, or the
/// first state failure.
pub fn pre_commit(engine: &Engine<'_>, files: &[PathBuf]) -> Result<()> {
    let mut blocked = 0;
    for file in files {
        let decision = engine.decide(file)?;
        if let Some(denial) = decision.denial(file) {
            eprintln!("tdd-gate: {denial}");
            blocked += 1;
        }
    }

    if blocked > 0 {
        return Err(Error::CommitBlocked(blocked));
    }
    Ok(())
}

/// Record every file as tested and passing; returns how many were recorded.
///
/// Files that vanished since the commit are skipped.
///
/// # Errors
///
/// Returns the first state failure.
pub fn post_commit(engine: &Engine<'_>, files: &[PathBuf]) -> Result<usize> {
    let mut recorded = 0;
    for file in files {
        match engine.record_passed(file) {
            Ok(()) => recorded += 1,
            Err(Error::TargetUnreadable { path, source }) => {
                warn!(path = %path.display(), "skipping unreadable committed file: {source}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(recorded)
}

/// Existing files under `root` whose extension is in `extensions`.
#[must_use]
pub fn source_files(root: &Path, names: &[String], extensions: &[String]) -> Vec<PathBuf> {
    names
        .iter()
        .map(|name| root.join(name))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e == ext))
        })
        .filter(|path| path.is_file())
        .collect()
}

/// Top level of the current repository.
fn repo_root() -> Result<PathBuf> {
    let lines = git_lines(&["rev-parse", "--show-toplevel"])?;
    lines
        .into_iter()
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| Error::Git("rev-parse returned no toplevel".to_string()))
}

/// Non-empty stdout lines of a git command.
fn git_lines(args: &[&str]) -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|e| Error::Git(format!("{}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!("{}: {}", args.join(" "), stderr.trim())));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::{Execution, TestExecutor};
    use crate::core::{Decision, state_key};
    use crate::storage::{MemoryBackend, StateBackend};
    use std::ffi::OsString;
    use std::fs;
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Exiting(i32);

    impl TestExecutor for Exiting {
        fn execute(
            &self,
            _program: &str,
            _args: &[OsString],
            _timeout: Option<Duration>,
        ) -> io::Result<Execution> {
            Ok(Execution {
                exit_code: Some(self.0),
                timed_out: false,
            })
        }
    }

    fn write(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("# {name}\n")).unwrap();
        path
    }

    #[test]
    fn source_files_filters_extension_and_existence() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py");
        write(temp.path(), "README.md");
        let names = vec![
            "app.py".to_string(),
            "README.md".to_string(),
            "deleted.py".to_string(),
        ];

        let files = source_files(temp.path(), &names, &["py".to_string()]);
        assert_eq!(files, vec![temp.path().join("app.py")]);
    }

    #[test]
    fn pre_commit_blocks_untested_files() {
        let temp = TempDir::new().unwrap();
        let tested = write(temp.path(), "calc.py");
        write(temp.path(), "test_calc.py");
        let untested = write(temp.path(), "orphan.py");

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let executor = Exiting(0);
        let engine = Engine::new(&config, &store, &runner, &executor);

        let result = pre_commit(&engine, &[tested.clone(), untested]);
        assert!(matches!(result, Err(Error::CommitBlocked(1))));
        assert!(store.load().unwrap().file(&state_key(&tested)).unwrap().test_passed);
    }

    #[test]
    fn pre_commit_passes_when_all_tested() {
        let temp = TempDir::new().unwrap();
        let calc = write(temp.path(), "calc.py");
        write(temp.path(), "test_calc.py");

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let executor = Exiting(0);
        let engine = Engine::new(&config, &store, &runner, &executor);

        assert!(pre_commit(&engine, &[calc]).is_ok());
        assert!(pre_commit(&engine, &[]).is_ok());
    }

    #[test]
    fn post_commit_marks_files_fresh() {
        let temp = TempDir::new().unwrap();
        let calc = write(temp.path(), "calc.py");
        let gone = temp.path().join("gone.py");

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        // A run would fail, so Fresh proves no run happened
        let executor = Exiting(1);
        let engine = Engine::new(&config, &store, &runner, &executor);

        assert_eq!(post_commit(&engine, &[calc.clone(), gone]).unwrap(), 1);
        assert_eq!(engine.decide(&calc).unwrap(), Decision::Fresh);
    }
}
