use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Exercise;
use crate::error::BuildError;
use crate::resolver::ExerciseResolver;

/// Upper bound on how many times one set is performed.
pub const MAX_SET_COUNT: u32 = 100;

/// A set in compact form: the exercise is referenced by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct WorkoutSet {
    #[serde(rename = "id")]
    pub exercise_id: String,
    pub sets: u32,
}

/// The durable representation of a workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

/// A set in expanded form: the full exercise record is embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSet {
    pub exercise: Exercise,
    pub sets: u32,
}

impl ExpandedSet {
    pub fn new(exercise: Exercise, sets: u32) -> Self {
        Self { exercise, sets }
    }
}

/// The in-memory editing representation of a workout.
///
/// `sets` is shared behind an `Arc`; structural edits replace the whole
/// vector so consumers can detect change with `Arc::ptr_eq`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandedWorkout {
    pub id: String,
    pub name: String,
    pub sets: Arc<Vec<ExpandedSet>>,
}

impl Workout {
    /// Resolve every set's exercise id into the full exercise.
    ///
    /// A set whose exercise no longer resolves fails the whole expansion;
    /// no set is ever dropped silently. Stored counts outside
    /// `1..=MAX_SET_COUNT` are rejected.
    pub fn expand<R: ExerciseResolver + ?Sized>(&self, resolver: &R) -> Result<ExpandedWorkout, BuildError> {
        let sets = self
            .sets
            .iter()
            .map(|set| {
                if !(1..=MAX_SET_COUNT).contains(&set.sets) {
                    return Err(BuildError::InvalidCount);
                }
                resolver
                    .lookup_exercise(&set.exercise_id)?
                    .map(|exercise| ExpandedSet::new(exercise, set.sets))
                    .ok_or_else(|| BuildError::DanglingReference {
                        workout: self.id.clone(),
                        exercise: set.exercise_id.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExpandedWorkout {
            id: self.id.clone(),
            name: self.name.clone(),
            sets: Arc::new(sets),
        })
    }

    /// Exercise ids referenced by this workout, in set order.
    pub fn exercise_ids(&self) -> impl Iterator<Item = &str> {
        self.sets.iter().map(|s| s.exercise_id.as_str())
    }

    pub fn total_sets(&self) -> u32 {
        self.sets.iter().map(|s| s.sets).sum()
    }
}

impl ExpandedWorkout {
    /// Reduce every set to exercise id plus count.
    pub fn compress(&self) -> Workout {
        Workout {
            id: self.id.clone(),
            name: self.name.clone(),
            sets: self
                .sets
                .iter()
                .map(|set| WorkoutSet {
                    exercise_id: set.exercise.id.clone(),
                    sets: set.sets,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl From<&ExpandedWorkout> for Workout {
    fn from(workout: &ExpandedWorkout) -> Self {
        workout.compress()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MuscleGroup;
    use std::collections::HashMap;

    fn exercises() -> HashMap<String, Exercise> {
        [
            Exercise::new("squat", "Squat", [MuscleGroup::Quads]),
            Exercise::new("bench", "Bench Press", [MuscleGroup::Chest]),
            Exercise::new("row", "Barbell Row", [MuscleGroup::Back]),
        ]
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect()
    }

    fn compact(sets: &[(&str, u32)]) -> Workout {
        Workout {
            id: "full_body".to_string(),
            name: "Full Body".to_string(),
            sets: sets
                .iter()
                .map(|(id, n)| WorkoutSet {
                    exercise_id: id.to_string(),
                    sets: *n,
                })
                .collect(),
        }
    }

    #[test]
    fn test_expand_embeds_exercises_in_order() {
        let workout = compact(&[("bench", 3), ("squat", 5), ("bench", 2)]);
        let expanded = workout.expand(&exercises()).unwrap();

        let names: Vec<&str> = expanded.sets.iter().map(|s| s.exercise.name.as_str()).collect();
        assert_eq!(names, vec!["Bench Press", "Squat", "Bench Press"]);
        let counts: Vec<u32> = expanded.sets.iter().map(|s| s.sets).collect();
        assert_eq!(counts, vec![3, 5, 2]);
    }

    #[test]
    fn test_round_trip_is_exact() {
        let resolver = exercises();
        let workout = compact(&[("row", 4), ("squat", 1), ("bench", 3)]);
        let expanded = workout.expand(&resolver).unwrap();

        assert_eq!(expanded.compress(), workout);
        assert_eq!(expanded.compress().expand(&resolver).unwrap(), expanded);
    }

    #[test]
    fn test_expand_fails_on_dangling_reference() {
        let workout = compact(&[("squat", 3), ("deadlift", 2)]);
        let err = workout.expand(&exercises()).unwrap_err();
        match err {
            BuildError::DanglingReference { workout, exercise } => {
                assert_eq!(workout, "full_body");
                assert_eq!(exercise, "deadlift");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expand_rejects_out_of_range_stored_count() {
        let resolver = exercises();
        for count in [0, MAX_SET_COUNT + 1, u32::MAX] {
            let err = compact(&[("squat", 3), ("bench", count)]).expand(&resolver).unwrap_err();
            assert!(matches!(err, BuildError::InvalidCount), "count {count}: {err}");
        }
        assert!(compact(&[("squat", MAX_SET_COUNT)]).expand(&resolver).is_ok());
    }

    #[test]
    fn test_compact_serialization_uses_exercise_id_field() {
        let workout = compact(&[("squat", 3)]);
        let json = serde_json::to_string(&workout).unwrap();
        assert_eq!(json, r#"{"id":"full_body","name":"Full Body","sets":[{"id":"squat","sets":3}]}"#);
        assert_eq!(workout.total_sets(), 3);
    }
}
