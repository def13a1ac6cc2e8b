//! `tdd-gate --reset` command implementation.

use crate::cli::{current_config, open_store};
use crate::error::Result;
use crate::storage::StateBackend;

/// Run the reset command.
///
/// Deletes the state store; every file is untested afterwards.
///
/// # Errors
///
/// Returns an error if the state file cannot be removed.
pub fn run() -> Result<()> {
    let config = current_config()?;
    let store = open_store(&config)?;
    clear(&store)?;
    println!("TDD state reset ({})", store.state_path().display());
    Ok(())
}

/// Remove all recorded state from `store`.
///
/// # Errors
///
/// Returns an error if the backend cannot be cleared.
pub fn clear(store: &dyn StateBackend) -> Result<()> {
    store.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::State;
    use crate::storage::{FileBackend, MemoryBackend};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn reset_clears_memory_state() {
        let mut state = State::new();
        state.put_file("/repo/a.py", "aa", Some(Utc::now()), true);
        let store = MemoryBackend::with_state(state);

        clear(&store).unwrap();
        assert_eq!(store.load().unwrap(), State::new());
    }

    #[test]
    fn reset_removes_state_file() {
        let temp = TempDir::new().unwrap();
        let store = FileBackend::new(temp.path().to_path_buf(), true).unwrap();
        let mut state = State::new();
        state.put_file("/repo/a.py", "aa", None, false);
        store.save(&state).unwrap();
        assert!(store.state_path().exists());

        clear(&store).unwrap();
        assert!(!store.state_path().exists());
        clear(&store).unwrap();
    }
}
