use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::exercises::parse_id;
use crate::error::DatabaseError;
use crate::models::{ExerciseHistory, ExerciseHistoryEntry, WorkoutHistory};

/// Read a JSON-encoded TEXT column
fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_exercise_history(row: &Row) -> rusqlite::Result<ExerciseHistory> {
    let exercise_id: i64 = row.get(1)?;
    Ok(ExerciseHistory {
        id: row.get(0)?,
        exercise_id: exercise_id.to_string(),
        exercise_name: row.get(2)?,
        workout_history_id: row.get(3)?,
        date: row.get(4)?,
        reps: json_column(row, 5)?,
        weight: json_column(row, 6)?,
    })
}

fn row_to_workout_history(row: &Row) -> rusqlite::Result<WorkoutHistory> {
    Ok(WorkoutHistory {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        date: row.get(2)?,
    })
}

const EXERCISE_HISTORY_SELECT: &str = "
SELECT h.id, h.exercise_id, e.name, h.workout_history_id, h.date, h.reps, h.weight
FROM exercise_history h
JOIN exercises e ON e.id = h.exercise_id";

fn insert_entry(conn: &Connection, entry: &ExerciseHistoryEntry, session: Option<i64>) -> Result<i64, DatabaseError> {
    if entry.reps.len() != entry.weight.len() {
        return Err(DatabaseError::MismatchedSets {
            reps: entry.reps.len(),
            weight: entry.weight.len(),
        });
    }

    // serde_json writes NaN and infinities as null, which would not read back
    if let Some(&bad) = entry.weight.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(DatabaseError::InvalidWeight(bad));
    }

    let exercise_id = parse_id(&entry.exercise_id)
        .ok_or_else(|| DatabaseError::NotFound(format!("exercise {}", entry.exercise_id)))?;
    let exists: Option<i64> = conn
        .query_row("SELECT id FROM exercises WHERE id = ?1", [exercise_id], |row| row.get(0))
        .optional()?;
    if exists.is_none() {
        return Err(DatabaseError::NotFound(format!("exercise {}", entry.exercise_id)));
    }

    conn.execute(
        "INSERT INTO exercise_history (exercise_id, workout_history_id, date, reps, weight)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            exercise_id,
            session.or(entry.workout_history_id),
            entry.date,
            serde_json::to_string(&entry.reps)?,
            serde_json::to_string(&entry.weight)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The `workout_history` and `exercise_history` tables.
pub struct HistoryTable<'c> {
    conn: &'c Connection,
}

impl<'c> HistoryTable<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert_workout(&self, workout_id: &str, date: &str) -> Result<WorkoutHistory, DatabaseError> {
        self.conn.execute(
            "INSERT INTO workout_history (workout_id, date) VALUES (?1, ?2)",
            params![workout_id, date],
        )?;
        Ok(WorkoutHistory {
            id: self.conn.last_insert_rowid(),
            workout_id: workout_id.to_string(),
            date: date.to_string(),
        })
    }

    pub fn insert_exercise(&self, entry: &ExerciseHistoryEntry) -> Result<i64, DatabaseError> {
        insert_entry(self.conn, entry, None)
    }

    /// Record one logged session atomically.
    ///
    /// With a `workout_id` a workout history record is created first and
    /// every entry is attached to it; its id is returned. An empty session
    /// writes nothing.
    pub fn insert_session(
        &self,
        workout_id: Option<&str>,
        date: &str,
        entries: &[ExerciseHistoryEntry],
    ) -> Result<Option<i64>, DatabaseError> {
        if entries.is_empty() {
            return Ok(None);
        }

        let tx = self.conn.unchecked_transaction()?;

        let session = match workout_id {
            Some(workout_id) => {
                tx.execute(
                    "INSERT INTO workout_history (workout_id, date) VALUES (?1, ?2)",
                    params![workout_id, date],
                )?;
                Some(tx.last_insert_rowid())
            }
            None => None,
        };

        for entry in entries {
            insert_entry(&tx, entry, session)?;
        }
        tx.commit()?;

        debug!(session = ?session, entries = entries.len(), "Recorded session");
        Ok(session)
    }

    /// All history for one exercise, newest first.
    pub fn list_for_exercise(&self, exercise_id: &str) -> Result<Vec<ExerciseHistory>, DatabaseError> {
        let Some(id) = parse_id(exercise_id) else {
            return Ok(Vec::new());
        };
        let sql = format!("{} WHERE h.exercise_id = ?1 ORDER BY h.date DESC, h.id DESC", EXERCISE_HISTORY_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([id], row_to_exercise_history)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Exercise entries logged under one workout session, in insertion order.
    pub fn entries_for_session(&self, workout_history_id: i64) -> Result<Vec<ExerciseHistory>, DatabaseError> {
        let sql = format!("{} WHERE h.workout_history_id = ?1 ORDER BY h.id", EXERCISE_HISTORY_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([workout_history_id], row_to_exercise_history)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Sessions of one workout, newest first.
    pub fn list_for_workout(&self, workout_id: &str) -> Result<Vec<WorkoutHistory>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workout_id, date FROM workout_history WHERE workout_id = ?1 ORDER BY date DESC, id DESC",
        )?;
        let rows = stmt.query_map([workout_id], row_to_workout_history)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_exercise_history(&self, id: i64) -> Result<(), DatabaseError> {
        let removed = self
            .conn
            .execute("DELETE FROM exercise_history WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(DatabaseError::NotFound(format!("exercise history {}", id)));
        }
        Ok(())
    }

    /// Delete a workout session and the exercise entries logged under it.
    /// Returns the number of exercise entries removed.
    pub fn delete_workout_history(&self, id: i64) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let entries = tx.execute("DELETE FROM exercise_history WHERE workout_history_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM workout_history WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(DatabaseError::NotFound(format!("workout history {}", id)));
        }
        tx.commit()?;
        Ok(entries)
    }

    pub fn delete_for_exercise(&self, exercise_id: i64) -> Result<usize, DatabaseError> {
        Ok(self
            .conn
            .execute("DELETE FROM exercise_history WHERE exercise_id = ?1", [exercise_id])?)
    }
}
