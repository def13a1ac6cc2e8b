//! `tdd-gate --report` command implementation.

use crate::cli::{current_config, open_store};
use crate::core::{State, TestRun};
use crate::error::Result;
use crate::storage::StateBackend;
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Days of history the summary covers.
const REPORT_DAYS: i64 = 7;

/// Number of runs listed individually in the text report.
const RECENT_RUNS: usize = 10;

/// Number of runs included in the JSON report.
const RECENT_RUNS_JSON: usize = 20;

/// Run the report command, as text or as JSON.
///
/// # Errors
///
/// Returns an error if the state store cannot be read.
pub fn run(json: bool) -> Result<()> {
    let config = current_config()?;
    let store = open_store(&config)?;
    let state = store.load()?;
    let now = Utc::now();

    if json {
        println!("{}", render_json(&state, now)?);
    } else {
        for line in render(&state, now) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Aggregate over the reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Runs inside the window.
    pub total: usize,

    /// Passing runs inside the window.
    pub passed: usize,
}

/// Machine-readable report.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// When the report was produced.
    pub generated: DateTime<Utc>,

    /// Window totals.
    pub summary: JsonSummary,

    /// Denials per kind over the whole retained history.
    pub violations: BTreeMap<&'static str, usize>,

    /// Newest runs first.
    pub recent_runs: Vec<&'a TestRun>,
}

/// Window totals in the JSON report.
#[derive(Debug, Serialize)]
pub struct JsonSummary {
    pub total_runs: usize,
    pub passed_runs: usize,
    pub pass_rate: f64,
}

impl Summary {
    /// Summarize runs recorded within [`REPORT_DAYS`] of `now`.
    #[must_use]
    pub fn of(runs: &[TestRun], now: DateTime<Utc>) -> Self {
        let since = now - Duration::days(REPORT_DAYS);
        let window = runs.iter().filter(|r| r.timestamp >= since);
        let (total, passed) = window.fold((0, 0), |(total, passed), run| {
            (total + 1, passed + usize::from(run.passed))
        });
        Self { total, passed }
    }

    /// Pass rate as a percentage, zero when nothing ran.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64 * 100.0
    }
}

/// Report lines for `state` as of `now`.
#[must_use]
pub fn render(state: &State, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        "=".repeat(60),
        "TDD Test Report".to_string(),
        "=".repeat(60),
    ];

    let summary = Summary::of(&state.runs, now);
    lines.push(format!("Test runs (last {REPORT_DAYS} days): {}", summary.total));
    lines.push(format!("Pass rate: {:.1}%", summary.pass_rate()));
    lines.push(String::new());

    let violations = state.violation_summary();
    if !violations.is_empty() {
        lines.push("Violations:".to_string());
        for (kind, count) in &violations {
            lines.push(format!("  - {}: {count}", kind.as_str()));
        }
        lines.push(String::new());
    }

    lines.push("Recent test runs:".to_string());
    lines.push("─".repeat(40));
    if state.runs.is_empty() {
        lines.push("(none)".to_string());
    }
    for run in state.runs.iter().rev().take(RECENT_RUNS) {
        let local: DateTime<Local> = run.timestamp.into();
        let result = if run.passed {
            "PASS"
        } else if run.timed_out {
            "TIME"
        } else {
            "FAIL"
        };
        lines.push(format!(
            "{} | {result} | {:>6}ms | {}",
            local.format("%Y-%m-%d %H:%M:%S"),
            run.duration_ms,
            run.target
        ));
    }
    lines
}

/// Pretty JSON report for `state` as of `now`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(state: &State, now: DateTime<Utc>) -> Result<String> {
    let summary = Summary::of(&state.runs, now);
    let report = JsonReport {
        generated: now,
        summary: JsonSummary {
            total_runs: summary.total,
            passed_runs: summary.passed,
            pass_rate: summary.pass_rate(),
        },
        violations: state
            .violation_summary()
            .into_iter()
            .map(|(kind, count)| (kind.as_str(), count))
            .collect(),
        recent_runs: state.runs.iter().rev().take(RECENT_RUNS_JSON).collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
