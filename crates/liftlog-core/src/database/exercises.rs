use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{BuildError, DatabaseError};
use crate::models::{Exercise, MuscleGroup};
use crate::resolver::ExerciseResolver;

fn row_to_exercise(row: &Row) -> rusqlite::Result<Exercise> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let groups: String = row.get(2)?;
    Ok(Exercise::new(
        id.to_string(),
        name,
        Exercise::parse_muscle_groups(&groups),
    ))
}

fn groups_csv(groups: &[MuscleGroup]) -> String {
    Exercise::new("", "", groups.iter().copied()).muscle_groups_csv()
}

/// Parse a store-facing exercise id into a row id.
pub fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

/// The `exercises` table.
pub struct ExerciseTable<'c> {
    conn: &'c Connection,
}

impl<'c> ExerciseTable<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn find(&self, id: i64) -> Result<Option<Exercise>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, muscle_groups FROM exercises WHERE id = ?1",
                [id],
                row_to_exercise,
            )
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<Exercise, DatabaseError> {
        self.find(id)?
            .ok_or_else(|| DatabaseError::NotFound(format!("exercise {}", id)))
    }

    pub fn list(&self) -> Result<Vec<Exercise>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, muscle_groups FROM exercises ORDER BY name COLLATE NOCASE")?;
        let rows = stmt.query_map([], row_to_exercise)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// True if another exercise (other than `except`) already uses `name`.
    pub fn name_exists(&self, name: &str, except: Option<i64>) -> Result<bool, DatabaseError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM exercises WHERE name = ?1 COLLATE NOCASE AND id != ?2",
                params![name.trim(), except.unwrap_or(-1)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a new exercise and return it with its generated id.
    pub fn insert(&self, name: &str, groups: &[MuscleGroup]) -> Result<Exercise, DatabaseError> {
        let name = name.trim();
        if self.name_exists(name, None)? {
            return Err(DatabaseError::NameTaken(name.to_string()));
        }

        self.conn.execute(
            "INSERT INTO exercises (name, muscle_groups) VALUES (?1, ?2)",
            params![name, groups_csv(groups)],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name, "Inserted exercise");

        Ok(Exercise::new(id.to_string(), name, groups.iter().copied()))
    }

    pub fn update(&self, id: i64, name: &str, groups: &[MuscleGroup]) -> Result<Exercise, DatabaseError> {
        let name = name.trim();
        if self.name_exists(name, Some(id))? {
            return Err(DatabaseError::NameTaken(name.to_string()));
        }

        let changed = self.conn.execute(
            "UPDATE exercises SET name = ?1, muscle_groups = ?2 WHERE id = ?3",
            params![name, groups_csv(groups), id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(format!("exercise {}", id)));
        }

        Ok(Exercise::new(id.to_string(), name, groups.iter().copied()))
    }

    /// Delete an exercise together with all of its history.
    ///
    /// Returns the number of history records removed. Workouts that still
    /// reference the exercise are left alone.
    pub fn delete(&self, id: i64) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let history = tx.execute("DELETE FROM exercise_history WHERE exercise_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM exercises WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(DatabaseError::NotFound(format!("exercise {}", id)));
        }
        tx.commit()?;

        debug!(id, history, "Deleted exercise");
        Ok(history)
    }
}

impl ExerciseResolver for ExerciseTable<'_> {
    fn get_exercise(&self, id: &str) -> Option<Exercise> {
        match self.lookup_exercise(id) {
            Ok(found) => found,
            Err(e) => {
                warn!(id, error = %e, "Exercise lookup failed");
                None
            }
        }
    }

    fn lookup_exercise(&self, id: &str) -> Result<Option<Exercise>, BuildError> {
        let Some(row_id) = parse_id(id) else {
            return Ok(None);
        };
        self.find(row_id).map_err(|source| BuildError::Lookup {
            exercise: id.to_string(),
            source,
        })
    }
}
