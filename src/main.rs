//! tdd-gate CLI - run a script only when its tests pass.

use clap::{ArgGroup, Parser};
use std::ffi::OsString;
use std::process::ExitCode;
use tdd_gate::cli;
use tdd_gate::cli::hook::HookKind;
use tracing_subscriber::EnvFilter;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.0"
/// - Development builds: "0.1.0-dev (abc1234)"
/// - Dirty working directory: "0.1.0-dev (abc1234-dirty)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("TDD_GATE_GIT_HASH");
    const IS_RELEASE: &str = env!("TDD_GATE_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "tdd-gate")]
#[command(author, version = version(), about = "Run a script only when its tests pass", long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["init", "status", "reset", "show_config", "uninstall", "report", "hook"])
        .multiple(false)
))]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Write a default .tdd-config.json in the current directory.
    #[arg(long)]
    init: bool,

    /// Show tracked files with their last test result.
    #[arg(long)]
    status: bool,

    /// Delete all recorded test state.
    #[arg(long)]
    reset: bool,

    /// Print the effective configuration.
    #[arg(long = "config")]
    show_config: bool,

    /// Run the installed uninstaller.
    #[arg(long)]
    uninstall: bool,

    /// Summarize recent test runs.
    #[arg(long)]
    report: bool,

    /// Print the report as JSON.
    #[arg(long, requires = "report")]
    json: bool,

    /// [Internal] Run a git hook. Called by the installed hook scripts.
    #[arg(long, value_enum)]
    hook: Option<HookKind>,

    /// Arguments passed verbatim to the interpreter.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, conflicts_with = "action")]
    args: Vec<OsString>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = if cli.init {
        cli::init::run().map(|()| 0)
    } else if cli.status {
        cli::status::run().map(|()| 0)
    } else if cli.reset {
        cli::reset::run().map(|()| 0)
    } else if cli.show_config {
        cli::show_config::run().map(|()| 0)
    } else if cli.uninstall {
        cli::uninstall::run()
    } else if cli.report {
        cli::report::run(cli.json).map(|()| 0)
    } else if let Some(kind) = cli.hook {
        cli::hook::run(kind).map(|()| 0)
    } else {
        cli::run::run(&cli.args)
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("tdd-gate: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `TDD_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TDD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
