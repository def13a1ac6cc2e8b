//! Pass-through invocation: gate, then launch the interpreter.

use crate::cli::{current_config, open_store};
use crate::config::Config;
use crate::core::{Engine, Launcher, ProcessExecutor, TestRunner, exit_code, script_argument};
use crate::error::{Error, Result};
use std::ffi::OsString;
use tracing::debug;

/// Run the gate for `args` and, if allowed, the interpreter.
///
/// Returns the interpreter's exit code.
///
/// # Errors
///
/// Returns the denial as an error, or any state/launch failure.
pub fn run(args: &[OsString]) -> Result<u8> {
    let config = current_config()?;
    let store = open_store(&config)?;
    let runner = TestRunner::from_config(&config);
    let executor = ProcessExecutor;
    let engine = Engine::new(&config, &store, &runner, &executor);

    gate(&config, &engine, args)?;

    let status = Launcher::new(&config.interpreter).launch(args)?;
    Ok(exit_code(status))
}

/// Decide whether the interpreter may run with `args`.
///
/// # Errors
///
/// Returns [`Error::ReplDisabled`] for script-less invocations when the REPL
/// is off, the taxonomy error for a denied script, or a state failure.
pub fn gate(config: &Config, engine: &Engine<'_>, args: &[OsString]) -> Result<()> {
    let Some(script) = script_argument(args) else {
        debug!("no script argument");
        return if config.allow_repl {
            Ok(())
        } else {
            Err(Error::ReplDisabled)
        };
    };

    let decision = engine.decide(&script)?;
    debug!(script = %script.display(), ?decision, "decision");
    match decision.denial(&script) {
        Some(denial) => Err(denial),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::runner::{Execution, TestExecutor};
    use crate::storage::MemoryBackend;
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

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn repl_allowed_by_default() {
        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let engine = Engine::new(&config, &store, &runner, &Exiting(1));

        assert!(gate(&config, &engine, &[]).is_ok());
        assert!(gate(&config, &engine, &args(&["-c", "print(1)"])).is_ok());
    }

    #[test]
    fn repl_denied_when_disabled() {
        let config = Config {
            allow_repl: false,
            ..Config::default()
        };
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let engine = Engine::new(&config, &store, &runner, &Exiting(0));

        assert!(matches!(
            gate(&config, &engine, &[]),
            Err(Error::ReplDisabled)
        ));
    }

    #[test]
    fn failing_tests_deny_script() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("app.py");
        fs::write(&script, "print('hi')\n").unwrap();
        fs::write(temp.path().join("test_app.py"), "def test_x(): pass\n").unwrap();

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let engine = Engine::new(&config, &store, &runner, &Exiting(1));

        let result = gate(&config, &engine, &[script.into_os_string()]);
        assert!(matches!(result, Err(Error::TestExecutionFailure { .. })));
    }

    #[test]
    fn passing_tests_allow_script() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("app.py");
        fs::write(&script, "print('hi')\n").unwrap();
        fs::write(temp.path().join("test_app.py"), "def test_x(): pass\n").unwrap();

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let engine = Engine::new(&config, &store, &runner, &Exiting(0));

        let mut argv = vec![OsString::from("-u"), script.into_os_string()];
        argv.push(OsString::from("--flag-for-script"));
        assert!(gate(&config, &engine, &argv).is_ok());
    }
}
