// File: src/store.rs
use crate::context::AppContext;
use crate::model::{Habit, Progress};
use crate::storage::LocalStorage;
use std::fmt;

/// Error surface for habit and theme mutations.
///
/// Mutations are optimistic. When `Persist` comes back the in-memory
/// change has already been applied and stays applied; only the durable
/// write failed. One policy for every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The habit name was empty after trimming.
    EmptyName,
    /// A controller was used before its initial load finished.
    NotReady,
    /// The durable write failed after the in-memory update was applied.
    Persist(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::EmptyName => write!(f, "Please enter a habit name"),
            StoreError::NotReady => write!(f, "Preferences are still loading"),
            StoreError::Persist(e) => write!(f, "Saved in memory only: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Screen-level controller owning the in-memory habit list.
///
/// Every mutation applies to memory first and then writes the whole list
/// through to storage. Last writer wins; there is no merging.
#[derive(Debug, Clone, Default)]
pub struct HabitStore {
    habits: Vec<Habit>,
    loading: bool,
}

impl HabitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reloads the list from storage. Runs on every focus event of the
    /// owning screen, so writes made elsewhere (a settings-screen reset)
    /// become visible when the user navigates back.
    pub fn initialize(&mut self, ctx: &dyn AppContext) {
        self.loading = true;
        self.habits = LocalStorage::load_habits(ctx);
        self.loading = false;
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> Progress {
        Progress::of(&self.habits)
    }

    /// Appends a new habit and persists the updated list. The name is
    /// trimmed first; blank names are rejected before anything changes.
    pub fn add(&mut self, ctx: &dyn AppContext, name: &str) -> Result<Habit, StoreError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let habit = Habit::new(trimmed);
        self.habits.push(habit.clone());
        self.persist(ctx)?;
        Ok(habit)
    }

    /// Flips `completed` on the matching habit and returns the new value.
    /// Unknown ids are a no-op (`Ok(None)`) and do not touch storage.
    pub fn toggle(&mut self, ctx: &dyn AppContext, id: &str) -> Result<Option<bool>, StoreError> {
        let Some(habit) = self.habits.iter_mut().find(|h| h.id == id) else {
            return Ok(None);
        };
        habit.completed = !habit.completed;
        let completed = habit.completed;
        self.persist(ctx)?;
        Ok(Some(completed))
    }

    /// Removes the matching habit. Unknown ids are an idempotent no-op
    /// (`Ok(false)`) and do not touch storage.
    pub fn delete(&mut self, ctx: &dyn AppContext, id: &str) -> Result<bool, StoreError> {
        let Some(idx) = self.habits.iter().position(|h| h.id == id) else {
            return Ok(false);
        };
        self.habits.remove(idx);
        self.persist(ctx)?;
        Ok(true)
    }

    fn persist(&self, ctx: &dyn AppContext) -> Result<(), StoreError> {
        match LocalStorage::save_habits(ctx, &self.habits) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("Failed to persist habit list: {}", e);
                Err(StoreError::Persist(e.to_string()))
            }
        }
    }
}
