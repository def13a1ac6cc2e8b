//! Hand-off to the real interpreter.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Long options whose next argument is a value, not the script.
const LONG_OPTIONS_WITH_VALUE: &[&str] = &["--check-hash-based-pycs"];

/// Short options that take a value, attached or as the next argument.
const SHORT_OPTIONS_WITH_VALUE: &[char] = &['W', 'X'];

/// Short options after which there is no script file to gate.
const NO_SCRIPT_OPTIONS: &[char] = &['c', 'm'];

/// Runs the configured interpreter with the caller's arguments.
#[derive(Debug, Clone)]
pub struct Launcher {
    interpreter: String,
}

impl Launcher {
    /// Create a launcher for `interpreter`.
    #[must_use]
    pub fn new(interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.to_string(),
        }
    }

    /// Run the interpreter with `args`, inheriting stdio, and wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the interpreter cannot be started.
    pub fn launch(&self, args: &[OsString]) -> Result<ExitStatus> {
        debug!(interpreter = %self.interpreter, ?args, "launching interpreter");
        Command::new(&self.interpreter)
            .args(args)
            .status()
            .map_err(|source| Error::Launch {
                program: self.interpreter.clone(),
                source,
            })
    }
}

/// The script path among interpreter arguments, if any.
///
/// The script is the first argument that is not an option or an option's
/// value. `-c`, `-m` and `-` mean the interpreter reads code from elsewhere,
/// including when `c` or `m` ends a group of short flags such as `-uc`.
#[must_use]
pub fn script_argument(args: &[OsString]) -> Option<PathBuf> {
    let mut iter = args.iter().map(OsString::as_os_str);
    while let Some(arg) = iter.next() {
        let Some(text) = arg.to_str() else {
            return Some(PathBuf::from(arg));
        };

        match text {
            "-" => return None,
            "--" => return iter.next().map(PathBuf::from),
            _ if LONG_OPTIONS_WITH_VALUE.contains(&text) => {
                iter.next();
            }
            _ if text.starts_with("--") => {}
            _ if text.starts_with('-') => match short_group(&text[1..]) {
                ShortGroup::NoScript => return None,
                ShortGroup::NeedsValue => {
                    iter.next();
                }
                ShortGroup::Flags => {}
            },
            _ => return Some(PathBuf::from(arg)),
        }
    }
    None
}

/// What a group of short flags like `-uOc` asks of the parser.
enum ShortGroup {
    /// Plain flags, possibly ending in an attached value.
    Flags,
    /// The last flag takes the next argument as its value.
    NeedsValue,
    /// Code comes from `-c` or `-m`.
    NoScript,
}

fn short_group(flags: &str) -> ShortGroup {
    for (i, flag) in flags.char_indices() {
        if NO_SCRIPT_OPTIONS.contains(&flag) {
            return ShortGroup::NoScript;
        }
        if SHORT_OPTIONS_WITH_VALUE.contains(&flag) {
            // Anything after the flag is its value
            return if i + flag.len_utf8() == flags.len() {
                ShortGroup::NeedsValue
            } else {
                ShortGroup::Flags
            };
        }
    }
    ShortGroup::Flags
}

/// Map an exit status to a process exit code.
///
/// Signals become `128 + signal` as shells report them.
#[must_use]
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return u8::try_from(code & 0xff).unwrap_or(1);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return u8::try_from(128 + signal).unwrap_or(1);
        }
    }

    1
}
