//! SQLite storage for the exercise catalog and logged history.
//!
//! Schema:
//! - `exercises`: id, name (unique), muscle_groups (comma-joined)
//! - `workout_history`: id, workout_id (store id of the workout), date
//! - `exercise_history`: id, exercise_id, workout_history_id, date,
//!   reps (JSON array), weight (JSON array)
//!
//! Deleting an exercise deletes its history; deleting a workout history
//! record deletes the exercise entries logged under it.

pub mod exercises;
pub mod history;

pub use exercises::ExerciseTable;
pub use history::HistoryTable;

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::DatabaseError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    muscle_groups TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS workout_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workout_id TEXT NOT NULL,
    date TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS exercise_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    exercise_id INTEGER NOT NULL REFERENCES exercises(id),
    workout_history_id INTEGER REFERENCES workout_history(id),
    date TEXT NOT NULL,
    reps TEXT NOT NULL,
    weight TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exercise_history_exercise ON exercise_history(exercise_id);
CREATE INDEX IF NOT EXISTS idx_workout_history_workout ON workout_history(workout_id);
";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = ?path, "Opened history database");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn exercises(&self) -> ExerciseTable<'_> {
        ExerciseTable::new(&self.conn)
    }

    pub fn history(&self) -> HistoryTable<'_> {
        HistoryTable::new(&self.conn)
    }
}
