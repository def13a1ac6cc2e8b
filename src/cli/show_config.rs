//! `tdd-gate --config` command implementation.

use crate::cli::current_config;
use crate::config::Config;
use crate::error::Result;

/// Run the config command: print the effective configuration as JSON.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
pub fn run() -> Result<()> {
    let config = current_config()?;
    println!("{}", render(&config)?);
    Ok(())
}

/// Pretty JSON for `config`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(config: &Config) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
