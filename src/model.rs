// Habit records and the progress summary derived from them.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One tracked habit. Serialized as part of the stored habit list, so the
/// field names below are the on-disk names (`createdAt` included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Builds a fresh, uncompleted habit with a random id. Callers are
    /// expected to have trimmed and validated `name`.
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate completion numbers for one habit list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(habits: &[Habit]) -> Self {
        let completed = habits.iter().filter(|h| h.completed).count();
        Self {
            completed,
            total: habits.len(),
        }
    }

    /// Completion ratio in `0.0..=1.0`. An empty list counts as zero, not
    /// as a division error.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}
