//! In-memory storage backend for testing.

use crate::core::State;
use crate::error::Result;
use crate::storage::traits::StateBackend;
use std::sync::RwLock;

/// In-memory storage backend for testing.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-loaded with `state`.
    #[must_use]
    pub fn with_state(state: State) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self) -> Result<State> {
        let state = self.state.read().unwrap();
        Ok(state.clone())
    }

    fn save(&self, state: &State) -> Result<()> {
        let mut stored = self.state.write().unwrap();
        *stored = state.clone();
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let mut stored = self.state.write().unwrap();
        *stored = State::new();
        Ok(())
    }

    fn update(&self, apply: &mut dyn FnMut(&mut State)) -> Result<State> {
        let mut stored = self.state.write().unwrap();
        apply(&mut *stored);
        Ok(stored.clone())
    }
}
