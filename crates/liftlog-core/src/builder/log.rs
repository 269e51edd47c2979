use crate::database::HistoryTable;
use crate::error::{BuildError, DatabaseError};
use crate::models::{Exercise, ExerciseHistoryEntry, ExpandedWorkout, MAX_SET_COUNT};

/// One performed set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoggedSet {
    pub reps: u32,
    pub weight: f64,
}

impl LoggedSet {
    pub fn is_done(&self) -> bool {
        self.reps > 0
    }
}

/// The rows logged for one exercise of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub exercise: Exercise,
    pub rows: Vec<LoggedSet>,
}

/// Records what was actually lifted during one session.
///
/// Started from a workout template, each workout set becomes an entry with
/// as many empty rows as the template's set count (at most `MAX_SET_COUNT`).
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    workout_id: Option<String>,
    entries: Vec<LogEntry>,
}

impl LogBuilder {
    /// A free-form log not tied to any workout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_workout(workout: &ExpandedWorkout) -> Self {
        let entries = workout
            .sets
            .iter()
            .map(|set| LogEntry {
                exercise: set.exercise.clone(),
                rows: vec![LoggedSet::default(); set.sets.min(MAX_SET_COUNT) as usize],
            })
            .collect();
        Self {
            workout_id: Some(workout.id.clone()).filter(|id| !id.is_empty()),
            entries,
        }
    }

    pub fn workout_id(&self) -> Option<&str> {
        self.workout_id.as_deref()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Add an exercise that was not part of the template.
    pub fn add_exercise(&mut self, exercise: Exercise) -> usize {
        self.entries.push(LogEntry {
            exercise,
            rows: vec![LoggedSet::default()],
        });
        self.entries.len() - 1
    }

    pub fn add_row(&mut self, entry: usize) -> Result<usize, BuildError> {
        let e = self.entry_mut(entry)?;
        e.rows.push(LoggedSet::default());
        Ok(e.rows.len() - 1)
    }

    pub fn remove_row(&mut self, entry: usize, row: usize) -> Result<LoggedSet, BuildError> {
        let e = self.entry_mut(entry)?;
        let len = e.rows.len();
        if row >= len {
            return Err(BuildError::OutOfBounds { index: row, len });
        }
        Ok(e.rows.remove(row))
    }

    pub fn record(&mut self, entry: usize, row: usize, reps: u32, weight: f64) -> Result<(), BuildError> {
        let e = self.entry_mut(entry)?;
        let len = e.rows.len();
        let slot = e
            .rows
            .get_mut(row)
            .ok_or(BuildError::OutOfBounds { index: row, len })?;
        *slot = LoggedSet { reps, weight };
        Ok(())
    }

    /// Fill the first unfinished row of `entry`, adding a row if all are done.
    /// Returns the row index written.
    pub fn record_next(&mut self, entry: usize, reps: u32, weight: f64) -> Result<usize, BuildError> {
        let e = self.entry_mut(entry)?;
        let row = match e.rows.iter().position(|r| !r.is_done()) {
            Some(row) => row,
            None => {
                e.rows.push(LoggedSet::default());
                e.rows.len() - 1
            }
        };
        e.rows[row] = LoggedSet { reps, weight };
        Ok(row)
    }

    /// History entries for every exercise with at least one completed row.
    /// Rows with zero reps are skipped.
    pub fn to_history(&self, date: &str) -> Vec<ExerciseHistoryEntry> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let done: Vec<&LoggedSet> = entry.rows.iter().filter(|r| r.is_done()).collect();
                if done.is_empty() {
                    return None;
                }
                Some(ExerciseHistoryEntry {
                    exercise_id: entry.exercise.id.clone(),
                    workout_history_id: None,
                    date: date.to_string(),
                    reps: done.iter().map(|r| r.reps).collect(),
                    weight: done.iter().map(|r| r.weight).collect(),
                })
            })
            .collect()
    }

    /// Write the session to history. Returns the workout history id when
    /// the log was started from a workout.
    pub fn commit(&self, history: &HistoryTable<'_>, date: &str) -> Result<Option<i64>, DatabaseError> {
        history.insert_session(self.workout_id(), date, &self.to_history(date))
    }

    fn entry_mut(&mut self, entry: usize) -> Result<&mut LogEntry, BuildError> {
        let len = self.entries.len();
        self.entries
            .get_mut(entry)
            .ok_or(BuildError::OutOfBounds { index: entry, len })
    }
}
