//! Storage trait definitions.

use crate::core::State;
use crate::error::Result;

/// Persistence backend for the enforcement state.
pub trait StateBackend: Send + Sync {
    /// Load the full state.
    ///
    /// Returns an empty state when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read.
    fn load(&self) -> Result<State>;

    /// Replace the stored state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, state: &State) -> Result<()>;

    /// Delete all stored state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn reset(&self) -> Result<()>;

    /// Read-modify-write the stored state, returning what was written.
    ///
    /// The default is an unguarded load then save; concurrent writers can
    /// lose updates. Backends that can lock override this.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or saving fails.
    fn update(&self, apply: &mut dyn FnMut(&mut State)) -> Result<State> {
        let mut state = self.load()?;
        apply(&mut state);
        self.save(&state)?;
        Ok(state)
    }
}
