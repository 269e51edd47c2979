use serde::{Deserialize, Serialize};

/// One completed session of a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutHistory {
    pub id: i64,
    #[serde(rename = "workoutId")]
    pub workout_id: String,
    pub date: String,
}

/// The sets performed for one exercise, ready to be inserted.
///
/// `reps` and `weight` are parallel: entry `i` of each describes set `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistoryEntry {
    #[serde(rename = "exerciseId")]
    pub exercise_id: String,
    #[serde(rename = "workoutHistoryId")]
    pub workout_history_id: Option<i64>,
    pub date: String,
    pub reps: Vec<u32>,
    pub weight: Vec<f64>,
}

/// A stored exercise history record, joined with the exercise name for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
    pub id: i64,
    #[serde(rename = "exerciseId")]
    pub exercise_id: String,
    #[serde(rename = "exerciseName")]
    pub exercise_name: String,
    #[serde(rename = "workoutHistoryId")]
    pub workout_history_id: Option<i64>,
    pub date: String,
    pub reps: Vec<u32>,
    pub weight: Vec<f64>,
}

impl ExerciseHistory {
    pub fn set_count(&self) -> usize {
        self.reps.len()
    }

    /// Total weight moved across all sets.
    pub fn volume(&self) -> f64 {
        self.reps
            .iter()
            .zip(&self.weight)
            .map(|(r, w)| f64::from(*r) * w)
            .sum()
    }

    /// Heaviest weight lifted for at least one rep.
    pub fn top_weight(&self) -> Option<f64> {
        self.reps
            .iter()
            .zip(&self.weight)
            .filter(|(r, _)| **r > 0)
            .map(|(_, w)| *w)
            .fold(None, |best, w| match best {
                Some(b) if b >= w => Some(b),
                _ => Some(w),
            })
    }
}
