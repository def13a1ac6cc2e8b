//! tdd-gate - refuses to run a source file until its tests pass.
//!
//! Each invocation hashes the target, checks the recorded test result for
//! freshness, discovers related tests by naming convention, runs them when
//! needed, and only then hands off to the interpreter.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
