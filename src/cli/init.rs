//! `tdd-gate --init` command implementation.

use crate::config::write_default_config;
use crate::error::Result;
use std::env;

/// Run the init command.
///
/// Writes `.tdd-config.json` with the defaults unless it already exists.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn run() -> Result<()> {
    let project_dir = env::current_dir()?;
    let (path, written) = write_default_config(&project_dir)?;
    if written {
        println!("Created {}", path.display());
    } else {
        println!("Config already exists: {}", path.display());
    }
    Ok(())
}
