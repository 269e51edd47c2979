//! Data models for liftlog entities.
//!
//! - `Exercise`, `MuscleGroup`: a movement and the muscles it trains
//! - `Workout`, `WorkoutSet`: the compact, persisted workout (sets reference
//!   exercises by id)
//! - `ExpandedWorkout`, `ExpandedSet`: the in-memory editing form (sets
//!   embed the full exercise)
//! - `WorkoutHistory`, `ExerciseHistory`: logged sessions

pub mod exercise;
pub mod history;
pub mod workout;

pub use exercise::{Exercise, MuscleGroup};
pub use history::{ExerciseHistory, ExerciseHistoryEntry, WorkoutHistory};
pub use workout::{ExpandedSet, ExpandedWorkout, Workout, WorkoutSet, MAX_SET_COUNT};

use serde::{de::DeserializeOwned, Serialize};

/// Anything a `Store` can hold: serializable and keyed by a stable string id.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + 'static {
    fn id(&self) -> &str;
}

impl Entity for Exercise {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Workout {
    fn id(&self) -> &str {
        &self.id
    }
}
