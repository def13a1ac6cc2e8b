//! CLI command implementations.

pub mod hook;
pub mod init;
pub mod report;
pub mod reset;
pub mod run;
pub mod show_config;
pub mod status;
pub mod uninstall;

use crate::config::{Config, load_config_lenient};
use crate::error::Result;
use crate::storage::FileBackend;
use crate::storage::file::get_state_dir;
use std::env;

/// Load the effective configuration for the current directory.
///
/// A malformed override is logged and replaced by defaults.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn current_config() -> Result<Config> {
    let project_dir = env::current_dir()?;
    let (config, _warning) = load_config_lenient(&project_dir);
    Ok(config)
}

/// Open the per-user state store.
///
/// # Errors
///
/// Returns an error if the state directory cannot be created.
pub fn open_store(config: &Config) -> Result<FileBackend> {
    FileBackend::new(get_state_dir(), config.lock_state)
}
