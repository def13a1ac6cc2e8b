//! File-based storage backend.

use crate::core::State;
use crate::error::Result;
use crate::storage::traits::StateBackend;
use fs2::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// State file name inside the state directory.
const STATE_FILE: &str = "state.json";

/// File-based storage backend with atomic writes.
#[derive(Debug)]
pub struct FileBackend {
    base_dir: PathBuf,
    lock: bool,
}

impl FileBackend {
    /// Create a new file backend.
    ///
    /// Creates the state directory if it doesn't exist. With `lock` set,
    /// [`StateBackend::update`] holds an exclusive lock for its whole
    /// read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created.
    pub fn new(base_dir: PathBuf, lock: bool) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, lock })
    }

    /// Path to the state file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.base_dir.join(STATE_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_path().with_extension("json.lock")
    }

    /// Directory holding the state files.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl StateBackend for FileBackend {
    fn load(&self) -> Result<State> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(State::new());
        }
        let contents = fs::read_to_string(&path)?;
        let state: State = serde_json::from_str(&contents)?;
        Ok(state)
    }

    fn save(&self, state: &State) -> Result<()> {
        let contents = serde_json::to_string_pretty(state)?;

        // Unique temp file per writer, renamed over the state file
        let mut temp = NamedTempFile::new_in(&self.base_dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.persist(self.state_path()).map_err(|e| e.error)?;

        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let path = self.state_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn update(&self, apply: &mut dyn FnMut(&mut State)) -> Result<State> {
        if !self.lock {
            let mut state = self.load()?;
            apply(&mut state);
            self.save(&state)?;
            return Ok(state);
        }

        let lock_file = File::create(self.lock_path())?;
        FileExt::lock_exclusive(&lock_file)?;
        debug!(path = %self.lock_path().display(), "acquired state lock");

        let result = self.load().and_then(|mut state| {
            apply(&mut state);
            self.save(&state).map(|()| state)
        });

        FileExt::unlock(&lock_file)?;
        result
    }
}

/// Get the state directory.
///
/// Uses `TDD_STATE_DIR` environment variable if set, otherwise `~/.tdd-state`.
#[must_use]
pub fn get_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TDD_STATE_DIR") {
        PathBuf::from(dir)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".tdd-state")
    } else {
        PathBuf::from(".tdd-state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn create_test_backend(lock: bool) -> (FileBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("state"), lock).unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn creates_state_directory() {
        let (backend, _temp) = create_test_backend(true);
        assert!(backend.base_dir().exists());
    }

    #[test]
    fn load_missing_state_is_empty() {
        let (store, _temp) = create_test_backend(true);
        assert_eq!(store.load().unwrap(), State::new());
    }

    #[test]
    fn save_and_load() {
        let (store, _temp) = create_test_backend(true);
        let mut state = State::new();
        state.put_file("calc.py", "abc", Some(Utc::now()), true);

        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let (store, _temp) = create_test_backend(false);
        store.save(&State::new()).unwrap();

        let names: Vec<_> = fs::read_dir(store.base_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(STATE_FILE)]);
    }

    #[test]
    fn unlocked_concurrent_saves_last_writer_wins() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileBackend::new(temp_dir.path().join("state"), false).unwrap());

        let mut handles = vec![];
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let mut errors = 0;
                for j in 0..100 {
                    // Differently sized states per writer
                    let mut state = State::new();
                    for k in 0..=(i * 3 + j % 7) {
                        state.put_file(&format!("w{i}-{k}.py"), "h", None, true);
                    }
                    if store.save(&state).is_err() {
                        errors += 1;
                    }
                }
                errors
            }));
        }

        let errors: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("Thread panicked"))
            .sum();
        assert_eq!(errors, 0);

        // Whatever landed last is one writer's whole state
        let state = store.load().unwrap();
        let writers: std::collections::BTreeSet<_> = state
            .files
            .keys()
            .map(|key| key.split('-').next().unwrap().to_string())
            .collect();
        assert_eq!(writers.len(), 1);
    }

    #[test]
    fn corrupted_state_is_an_error() {
        let (store, _temp) = create_test_backend(true);
        fs::write(store.state_path(), "{ this is not valid json }").unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn truncated_state_is_an_error() {
        let (store, _temp) = create_test_backend(true);
        fs::write(store.state_path(), r#"{"files": {"a.py": {"#).unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn reset_removes_state() {
        let (store, _temp) = create_test_backend(true);
        store.save(&State::new()).unwrap();

        store.reset().unwrap();
        assert!(!store.state_path().exists());
    }

    #[test]
    fn reset_without_state_succeeds() {
        let (store, _temp) = create_test_backend(true);
        store.reset().unwrap();
    }

    #[test]
    fn update_applies_and_persists() {
        let (store, _temp) = create_test_backend(true);

        let written = store
            .update(&mut |state| state.put_file("a.py", "h", None, false))
            .unwrap();

        assert!(written.file("a.py").is_some());
        assert!(store.load().unwrap().file("a.py").is_some());
    }

    #[test]
    fn update_on_corrupted_state_leaves_file_alone() {
        let (store, _temp) = create_test_backend(true);
        fs::write(store.state_path(), "garbage").unwrap();

        assert!(store.update(&mut |_| {}).is_err());
        assert_eq!(fs::read_to_string(store.state_path()).unwrap(), "garbage");
    }

    #[test]
    fn locked_updates_do_not_lose_writes() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("state");
        let store = Arc::new(FileBackend::new(dir, true).unwrap());

        let mut handles = vec![];
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..5 {
                    let path = format!("file-{i}-{j}.py");
                    store
                        .update(&mut |state| state.put_file(&path, "h", None, false))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.load().unwrap().files.len(), 40);
    }
}
