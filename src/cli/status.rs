//! `tdd-gate --status` command implementation.

use crate::cli::{current_config, open_store};
use crate::core::{FileState, State};
use crate::error::Result;
use crate::storage::StateBackend;
use chrono::{DateTime, Local, Utc};

/// Width of the table rule.
const RULE_WIDTH: usize = 90;

/// Run the status command.
///
/// Prints every tracked file with its last result and last successful test.
///
/// # Errors
///
/// Returns an error if the state store cannot be read.
pub fn run() -> Result<()> {
    let config = current_config()?;
    let store = open_store(&config)?;
    let state = store.load()?;

    if state.files.is_empty() {
        println!("No files tracked yet.");
        println!("\nState is stored in: {}", store.state_path().display());
        return Ok(());
    }

    for line in render(&state) {
        println!("{line}");
    }
    Ok(())
}

/// Status table lines for `state`.
#[must_use]
pub fn render(state: &State) -> Vec<String> {
    let mut lines = Vec::with_capacity(state.files.len() + 4);
    lines.push(format!("{:<6} {:<20} File", "Result", "Last tested"));
    lines.push("─".repeat(RULE_WIDTH));

    for (path, file) in &state.files {
        lines.push(format!(
            "{:<6} {:<20} {path}",
            result_label(file),
            format_last_tested(file.last_tested)
        ));
    }

    let passing = state.files.values().filter(|f| f.test_passed).count();
    lines.push("─".repeat(RULE_WIDTH));
    lines.push(format!(
        "{} file(s) tracked, {passing} passing",
        state.files.len()
    ));
    lines
}

fn result_label(file: &FileState) -> &'static str {
    if file.test_passed { "PASS" } else { "FAIL" }
}

fn format_last_tested(last_tested: Option<DateTime<Utc>>) -> String {
    match last_tested {
        Some(utc) => {
            let local: DateTime<Local> = utc.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn status_lists_each_file() {
        let mut state = State::new();
        state.put_file("/repo/calc.py", "aa", Some(Utc::now()), true);
        state.put_file("/repo/broken.py", "bb", None, false);
        let store = MemoryBackend::with_state(state);

        let lines = render(&store.load().unwrap());

        // BTreeMap order: broken before calc
        assert!(lines[2].starts_with("FAIL"));
        assert!(lines[2].contains("never"));
        assert!(lines[2].ends_with("/repo/broken.py"));
        assert!(lines[3].starts_with("PASS"));
        assert!(lines[3].ends_with("/repo/calc.py"));
        assert_eq!(lines.last().unwrap(), "2 file(s) tracked, 1 passing");
    }

    #[test]
    fn failing_file_keeps_previous_timestamp() {
        let earlier = Utc::now();
        let mut state = State::new();
        state.put_file("/repo/calc.py", "aa", Some(earlier), false);

        let lines = render(&state);
        assert!(lines[2].starts_with("FAIL"));
        assert!(lines[2].contains(&format_last_tested(Some(earlier))));
    }
}
