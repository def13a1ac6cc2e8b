//! `tdd-gate --uninstall` command implementation.

use crate::core::exit_code;
use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Uninstall script name inside the install directory.
const UNINSTALL_SCRIPT: &str = "uninstall.sh";

/// Run the uninstall command, delegating to the installed shell script.
///
/// Returns the script's exit code.
///
/// # Errors
///
/// Returns [`Error::UninstallerMissing`] if the script is absent, or
/// [`Error::Launch`] if `sh` cannot be started.
pub fn run() -> Result<u8> {
    run_script(&uninstaller_path(&get_install_dir()))
}

/// Run `script` with `sh`, inheriting stdio.
///
/// # Errors
///
/// See [`run`].
pub fn run_script(script: &Path) -> Result<u8> {
    if !script.is_file() {
        return Err(Error::UninstallerMissing(script.to_path_buf()));
    }

    debug!(script = %script.display(), "running uninstaller");
    let status = Command::new("sh")
        .arg(script)
        .status()
        .map_err(|source| Error::Launch {
            program: "sh".to_string(),
            source,
        })?;
    Ok(exit_code(status))
}

/// Uninstaller location inside `install_dir`.
#[must_use]
pub fn uninstaller_path(install_dir: &Path) -> PathBuf {
    install_dir.join(UNINSTALL_SCRIPT)
}

/// Get the install directory.
///
/// Uses `TDD_INSTALL_DIR` environment variable if set, otherwise `~/.tdd-python`.
#[must_use]
pub fn get_install_dir() -> PathBuf {
    if let Ok(dir) = env::var("TDD_INSTALL_DIR") {
        PathBuf::from(dir)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".tdd-python")
    } else {
        PathBuf::from(".tdd-python")
    }
}
