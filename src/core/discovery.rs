//! Test discovery by naming convention.
//!
//! For a source file `D/S.E` the related tests are, in order:
//! `D/test_S.E`, `D/S_test.E`, `D/tests/test_S.E`, `D/tests/S_test.E`,
//! then `D/test_S_*.E` and `D/tests/test_S_*.E` (each sorted). Nothing here
//! reads file contents.

use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Extension assumed when the target has none.
const DEFAULT_EXTENSION: &str = "py";

/// Find existing test files related to `path`.
///
/// Returns an empty list if nothing matches or `path` has no file stem.
#[must_use]
pub fn find_related_tests(path: &Path) -> Vec<PathBuf> {
    let Some((dir, stem, ext)) = split_target(path) else {
        return Vec::new();
    };
    let tests_dir = dir.join("tests");

    let fixed = [
        dir.join(format!("test_{stem}.{ext}")),
        dir.join(format!("{stem}_test.{ext}")),
        tests_dir.join(format!("test_{stem}.{ext}")),
        tests_dir.join(format!("{stem}_test.{ext}")),
    ];

    let mut found: Vec<PathBuf> = Vec::new();
    let wildcard = [&dir, &tests_dir]
        .into_iter()
        .flat_map(|base| wildcard_matches(base, &stem, &ext));

    for candidate in fixed.into_iter().chain(wildcard) {
        if candidate.is_file() && !found.contains(&candidate) {
            found.push(candidate);
        }
    }
    found
}

/// Test filenames that would be picked up for `path`, relative to its directory.
#[must_use]
pub fn expected_test_names(path: &Path) -> Vec<String> {
    let Some((_, stem, ext)) = split_target(path) else {
        return Vec::new();
    };
    vec![
        format!("test_{stem}.{ext}"),
        format!("{stem}_test.{ext}"),
        format!("tests/test_{stem}.{ext}"),
        format!("tests/{stem}_test.{ext}"),
    ]
}

/// Whether `path` is itself a test file according to `patterns`.
#[must_use]
pub fn is_test_file(path: &Path, patterns: &[String]) -> bool {
    matching_pattern(path, patterns).is_some()
}

/// First pattern in `patterns` that matches `path`.
#[must_use]
pub fn matching_pattern<'a>(path: &Path, patterns: &'a [String]) -> Option<&'a str> {
    patterns
        .iter()
        .map(String::as_str)
        .find(|pattern| matches_path(pattern, path))
}

/// Match a glob against a path, anchored at the right.
///
/// A relative pattern with N `/`-separated parts is compared with the last N
/// components of the path, so `tests/test_*.py` matches
/// `/repo/pkg/tests/test_io.py`. Absolute patterns and patterns containing
/// `**` are compared with the whole path.
#[must_use]
pub fn matches_path(pattern: &str, path: &Path) -> bool {
    let glob = match Pattern::new(pattern) {
        Ok(glob) => glob,
        Err(e) => {
            warn!(pattern, "ignoring invalid glob: {e}");
            return false;
        }
    };

    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::default()
    };

    if pattern.starts_with('/') || pattern.contains("**") {
        return glob.matches_path_with(path, options);
    }

    let depth = pattern.split('/').filter(|part| !part.is_empty()).count();
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if depth == 0 || components.len() < depth {
        return false;
    }
    glob.matches_with(&components[components.len() - depth..].join("/"), options)
}

/// Split a target into (parent directory, stem, extension).
fn split_target(path: &Path) -> Option<(PathBuf, String, String)> {
    let stem = path.file_stem()?.to_str()?.to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DEFAULT_EXTENSION)
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, stem, ext))
}

/// Sorted existing files matching `base/test_{stem}_*.{ext}`.
fn wildcard_matches(base: &Path, stem: &str, ext: &str) -> Vec<PathBuf> {
    if !base.is_dir() {
        return Vec::new();
    }

    let pattern = format!(
        "{}/test_{}_*.{}",
        Pattern::escape(&base.to_string_lossy()),
        Pattern::escape(stem),
        Pattern::escape(ext)
    );

    let mut matches: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(std::result::Result::ok).collect(),
        Err(e) => {
            warn!(pattern, "skipping wildcard test lookup: {e}");
            Vec::new()
        }
    };
    matches.sort();
    matches
}
