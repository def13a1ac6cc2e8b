//! Property tests for freshness and exemption decisions.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::cell::Cell;
use std::ffi::OsString;
use std::fs;
use std::io;
use tdd_gate::config::Config;
use tdd_gate::core::runner::Execution;
use tdd_gate::core::{Decision, Engine, ExemptReason, FileState, TestExecutor, TestRunner};
use tdd_gate::storage::{MemoryBackend, StateBackend};
use tempfile::TempDir;

struct Counting {
    calls: Cell<usize>,
}

impl TestExecutor for Counting {
    fn execute(
        &self,
        _program: &str,
        _args: &[OsString],
        _timeout: Option<std::time::Duration>,
    ) -> io::Result<Execution> {
        self.calls.set(self.calls.get() + 1);
        Ok(Execution {
            exit_code: Some(0),
            timed_out: false,
        })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn fresh_iff_same_hash_passed_and_in_window(
        same_hash in any::<bool>(),
        passed in any::<bool>(),
        age_secs in 0i64..7200,
        window_mins in 0i64..90,
    ) {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let file = FileState {
            hash: "abc".to_string(),
            last_tested: Some(now - Duration::seconds(age_secs)),
            test_passed: passed,
        };
        let current = if same_hash { "abc" } else { "def" };

        let expected = same_hash && passed && age_secs <= window_mins * 60;
        prop_assert_eq!(file.is_fresh(current, now, Duration::minutes(window_mins)), expected);
    }

    #[test]
    fn never_tested_is_never_fresh(hash in "[0-9a-f]{8}", passed in any::<bool>()) {
        let file = FileState {
            hash: hash.clone(),
            last_tested: None,
            test_passed: passed,
        };
        prop_assert!(!file.is_fresh(&hash, Utc::now(), Duration::days(365)));
    }

    #[test]
    fn content_change_forces_a_run(original in "[a-z ]{1,40}", edit in "[A-Z]{1,10}") {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("module.py");
        fs::write(&source, &original).unwrap();
        fs::write(temp.path().join("test_module.py"), "def test_ok(): pass\n").unwrap();

        let config = Config::default();
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| true);
        let executor = Counting { calls: Cell::new(0) };
        let engine = Engine::new(&config, &store, &runner, &executor);

        engine.decide(&source).unwrap();
        prop_assert_eq!(engine.decide(&source).unwrap(), Decision::Fresh);

        fs::write(&source, format!("{original}{edit}")).unwrap();
        let decision = engine.decide(&source).unwrap();
        prop_assert!(matches!(decision, Decision::Passed { .. }), "expected Decision::Passed, got {:?}", decision);
        prop_assert_eq!(executor.calls.get(), 2);
    }

    #[test]
    fn excluded_names_never_touch_state(dir in "[a-z]{1,8}", name in "[a-z]{1,8}") {
        let config = Config {
            excluded_files: vec![format!("{name}.py")],
            ..Config::default()
        };
        let store = MemoryBackend::new();
        let runner = TestRunner::with_availability(&config, |_| false);
        let executor = Counting { calls: Cell::new(0) };
        let engine = Engine::new(&config, &store, &runner, &executor);

        // Never created on disk
        let path = std::path::PathBuf::from(format!("/nonexistent/{dir}/{name}.py"));
        let decision = engine.decide(&path).unwrap();

        let is_test_name = name.starts_with("test_") || name.ends_with("_test") || name == "tests";
        if is_test_name {
            prop_assert_eq!(decision, Decision::Exempt(ExemptReason::TestFile));
        } else {
            prop_assert_eq!(decision, Decision::Exempt(ExemptReason::Excluded(format!("{name}.py"))));
        }
        prop_assert_eq!(executor.calls.get(), 0);
        prop_assert!(store.load().unwrap().files.is_empty());
    }
}
