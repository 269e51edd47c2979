//! Lookup seam between builders and whatever owns exercises.

use std::collections::HashMap;

use crate::error::BuildError;
use crate::models::Exercise;

/// Synchronous exercise lookup used while hydrating or editing a workout.
///
/// Absence is a normal answer here; callers turn it into the right error.
pub trait ExerciseResolver {
    fn get_exercise(&self, id: &str) -> Option<Exercise>;

    /// Like `get_exercise`, but a backend failure is an error rather than
    /// an absent exercise. Builders go through this.
    fn lookup_exercise(&self, id: &str) -> Result<Option<Exercise>, BuildError> {
        Ok(self.get_exercise(id))
    }
}

impl<R: ExerciseResolver + ?Sized> ExerciseResolver for &R {
    fn get_exercise(&self, id: &str) -> Option<Exercise> {
        (**self).get_exercise(id)
    }

    fn lookup_exercise(&self, id: &str) -> Result<Option<Exercise>, BuildError> {
        (**self).lookup_exercise(id)
    }
}

impl ExerciseResolver for HashMap<String, Exercise> {
    fn get_exercise(&self, id: &str) -> Option<Exercise> {
        self.get(id).cloned()
    }
}
