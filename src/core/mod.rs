//! Core types and enforcement logic.

pub mod discovery;
pub mod engine;
pub mod launcher;
pub mod runner;
pub mod state;

pub use engine::{Decision, Engine, ExemptReason, state_key};
pub use launcher::{Launcher, exit_code, script_argument};
pub use runner::{ProcessExecutor, RunnerCommand, TestExecutor, TestRunner};
pub use state::{
    FileState, State, TestRun, TestState, Violation, ViolationKind, content_hash,
};
