//! Configuration loading and management.
//!
//! Configuration is loaded with the following precedence:
//! 1. Environment variables (`TDD_*`)
//! 2. Project override file (`$TDD_CONFIG`, `.tdd-config.json` or `.tdd-config.toml`)
//! 3. Global file (`~/.tdd-config.json`, `~/.config/tdd/config.json` or `/etc/tdd/config.json`)
//! 4. Built-in defaults
//!
//! Override files replace top-level keys wholesale; lists are not merged.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// JSON override file looked up in the project directory.
pub const JSON_CONFIG_FILE: &str = ".tdd-config.json";

/// TOML override file looked up in the project directory.
pub const TOML_CONFIG_FILE: &str = ".tdd-config.toml";

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    /// Minutes a passing result stays fresh.
    pub test_timeout_minutes: u32,

    /// Master enforcement switch for running files.
    pub require_test_before_run: bool,

    /// Master enforcement switch for the pre-commit hook.
    pub require_test_before_commit: bool,

    /// Glob patterns identifying a path as itself a test file.
    pub test_patterns: Vec<String>,

    /// Test runner invocations, highest priority first.
    pub test_commands: Vec<String>,

    /// Glob patterns exempt from enforcement.
    pub excluded_files: Vec<String>,

    /// Deny when no test file is found instead of running the whole suite.
    pub strict_mode: bool,

    /// Permit interpreter invocations without a script argument.
    pub allow_repl: bool,

    /// Upper bound on a single test subprocess, in seconds.
    ///
    /// Independent of `test_timeout_minutes`, which only ages recorded results.
    pub test_run_timeout_seconds: Option<u64>,

    /// Interpreter the launcher hands off to.
    pub interpreter: String,

    /// Extensions of staged files the pre-commit hook checks.
    pub source_extensions: Vec<String>,

    /// Lock the state file during read-modify-write.
    pub lock_state: bool,

    /// Maximum number of test runs kept in history.
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test_timeout_minutes: 5,
            require_test_before_run: true,
            require_test_before_commit: true,
            test_patterns: strings(&[
                "test_*.py",
                "*_test.py",
                "tests.py",
                "tests/test_*.py",
                "tests/*_test.py",
            ]),
            test_commands: strings(&[
                "pytest",
                "python -m pytest",
                "python -m unittest",
                "nose2",
                "python -m nose2",
            ]),
            excluded_files: strings(&[
                "setup.py",
                "conftest.py",
                "__init__.py",
                "test_*.py",
                "*_test.py",
            ]),
            strict_mode: true,
            allow_repl: true,
            test_run_timeout_seconds: None,
            interpreter: "python3".to_string(),
            source_extensions: strings(&["py"]),
            lock_state: true,
            history_limit: 200,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Environment lookup; the process environment outside tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Global config files, most specific first. The first one that exists is used.
#[must_use]
pub fn global_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(JSON_CONFIG_FILE));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("tdd").join("config.json"));
    }
    paths.push(PathBuf::from("/etc/tdd/config.json"));
    paths
}

/// Load configuration for a project directory.
///
/// # Errors
///
/// Returns [`Error::Config`] if a global or project file exists but cannot
/// be parsed.
pub fn load_config(project_dir: &Path) -> Result<Config> {
    load_layered(project_dir, &global_config_paths(), &process_env)
}

/// Load configuration, falling back to defaults on a malformed override.
///
/// The parse error is logged and handed back so callers can surface it.
#[must_use]
pub fn load_config_lenient(project_dir: &Path) -> (Config, Option<Error>) {
    load_lenient(project_dir, &global_config_paths(), &process_env)
}

/// [`load_config_lenient`] with explicit global files and environment.
#[must_use]
pub fn load_lenient(
    project_dir: &Path,
    global_paths: &[PathBuf],
    env: EnvLookup<'_>,
) -> (Config, Option<Error>) {
    match load_layered(project_dir, global_paths, env) {
        Ok(config) => (config, None),
        Err(e) => {
            warn!("{e}; using default configuration");
            let mut config = Config::default();
            apply_env_overrides(&mut config, env);
            (config, Some(e))
        }
    }
}

/// [`load_config`] with explicit global files and environment.
///
/// Defaults, then the first existing global file, then the project
/// override, then `TDD_*` variables. Each file layer replaces top-level keys.
///
/// # Errors
///
/// Returns [`Error::Config`] if a file layer cannot be parsed.
pub fn load_layered(
    project_dir: &Path,
    global_paths: &[PathBuf],
    env: EnvLookup<'_>,
) -> Result<Config> {
    let mut merged = Map::new();

    if let Some(path) = global_paths.iter().find(|path| path.is_file()) {
        merged.extend(read_layer(path)?);
    }
    if let Some(path) = find_config_path(project_dir, env) {
        merged.extend(read_layer(&path)?);
    }

    let mut config: Config = serde_json::from_value(Value::Object(merged))
        .map_err(|e| Error::Config(e.to_string()))?;
    apply_env_overrides(&mut config, env);
    Ok(config)
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Locate the project override: `$TDD_CONFIG` first, then the project files.
fn find_config_path(project_dir: &Path, env: EnvLookup<'_>) -> Option<PathBuf> {
    if let Some(path) = env("TDD_CONFIG") {
        let path = PathBuf::from(path);
        return path.exists().then_some(path);
    }

    [JSON_CONFIG_FILE, TOML_CONFIG_FILE]
        .iter()
        .map(|name| project_dir.join(name))
        .find(|path| path.exists())
}

/// Parse an override file, choosing the format by extension.
///
/// # Errors
///
/// Returns [`Error::Config`] on unreadable or malformed files.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let layer = read_layer(path)?;
    serde_json::from_value(Value::Object(layer)).map_err(|e| config_error(path, &e))
}

/// Top-level keys of a config file, checked against [`Config`].
fn read_layer(path: &Path) -> Result<Map<String, Value>> {
    debug!(path = %path.display(), "loading config layer");
    let contents = fs::read_to_string(path).map_err(|e| config_error(path, &e))?;

    let value: Value = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&contents).map_err(|e| config_error(path, &e))?
    } else {
        serde_json::from_str(&contents).map_err(|e| config_error(path, &e))?
    };

    let Value::Object(layer) = value else {
        return Err(Error::Config(format!(
            "{}: expected a table of settings",
            path.display()
        )));
    };

    // Type errors must name the file they came from
    serde_json::from_value::<Config>(Value::Object(layer.clone()))
        .map_err(|e| config_error(path, &e))?;
    Ok(layer)
}

fn config_error(path: &Path, e: &dyn std::fmt::Display) -> Error {
    Error::Config(format!("{}: {e}", path.display()))
}

/// Write the default configuration as `.tdd-config.json` unless one exists.
///
/// Returns the path and whether a file was written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(project_dir: &Path) -> Result<(PathBuf, bool)> {
    let path = project_dir.join(JSON_CONFIG_FILE);
    if path.exists() {
        return Ok((path, false));
    }

    let contents = serde_json::to_string_pretty(&Config::default())?;
    fs::write(&path, format!("{contents}\n"))?;
    Ok((path, true))
}

/// Apply environment variable overrides to config.
fn apply_env_overrides(config: &mut Config, env: EnvLookup<'_>) {
    if let Some(minutes) = env_parse(env, "TDD_TEST_TIMEOUT_MINUTES") {
        config.test_timeout_minutes = minutes;
    }

    if let Some(strict) = env("TDD_STRICT_MODE").and_then(|v| parse_bool(&v)) {
        config.strict_mode = strict;
    }

    if let Some(require) = env("TDD_REQUIRE_TEST_BEFORE_RUN").and_then(|v| parse_bool(&v)) {
        config.require_test_before_run = require;
    }

    if let Some(repl) = env("TDD_ALLOW_REPL").and_then(|v| parse_bool(&v)) {
        config.allow_repl = repl;
    }

    if let Some(interpreter) = env("TDD_INTERPRETER").filter(|v| !v.trim().is_empty()) {
        config.interpreter = interpreter;
    }
}

fn env_parse<T: std::str::FromStr>(env: EnvLookup<'_>, key: &str) -> Option<T> {
    env(key).and_then(|v| v.trim().parse().ok())
}

/// Parse the boolean spellings accepted in environment variables.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
