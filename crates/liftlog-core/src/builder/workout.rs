use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::BuildError;
use crate::models::{ExpandedSet, ExpandedWorkout, Workout, MAX_SET_COUNT};
use crate::resolver::ExerciseResolver;
use crate::store::{PendingWrite, Store, Subscribers};
use crate::utils::derive_id;

/// Where `add_exercise` places an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPosition {
    /// Append after the last set with a count of 1.
    End,
    /// Insert at this index, shifting later sets down. The new set takes
    /// the count of the set that was there (1 when appending).
    Index(usize),
    /// Swap the exercise of the set at this index, keeping its count.
    Replace(usize),
    /// A member inside a composite set (superset, choice). Not supported yet.
    Member { set: usize, member: usize },
}

impl fmt::Display for SetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetPosition::End => write!(f, "end"),
            SetPosition::Index(i) => write!(f, "index {}", i),
            SetPosition::Replace(i) => write!(f, "replace {}", i),
            SetPosition::Member { set, member } => write!(f, "set {} member {}", set, member),
        }
    }
}

/// Result of `WorkoutBuilder::save`.
#[derive(Debug)]
pub struct SavedWorkout {
    /// The compact form handed to the store.
    pub workout: Workout,
    /// The queued durable write; await it to learn whether it landed.
    pub write: PendingWrite,
}

pub struct WorkoutBuilder<'r, R: ExerciseResolver + ?Sized> {
    resolver: &'r R,
    workout: ExpandedWorkout,
    revision: u64,
    subscribers: Subscribers<ExpandedWorkout>,
}

impl<'r, R: ExerciseResolver + ?Sized> WorkoutBuilder<'r, R> {
    /// Start a new, nameless workout with no sets.
    pub fn empty(resolver: &'r R) -> Self {
        Self::with_workout(resolver, ExpandedWorkout::default())
    }

    /// Hydrate the stored workout `id` for editing.
    ///
    /// Fails if the workout is gone or references an exercise that no
    /// longer resolves.
    pub fn from_id(resolver: &'r R, workouts: &Store<Workout>, id: &str) -> Result<Self, BuildError> {
        let workout = workouts
            .get(id)
            .ok_or_else(|| BuildError::WorkoutNotFound(id.to_string()))?;
        Self::from_workout(resolver, workout)
    }

    pub fn from_workout(resolver: &'r R, workout: &Workout) -> Result<Self, BuildError> {
        let expanded = workout.expand(resolver)?;
        debug!(workout = %workout.id, sets = expanded.len(), "Hydrated workout builder");
        Ok(Self::with_workout(resolver, expanded))
    }

    fn with_workout(resolver: &'r R, workout: ExpandedWorkout) -> Self {
        Self {
            resolver,
            workout,
            revision: 0,
            subscribers: Subscribers::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.workout.id
    }

    pub fn name(&self) -> &str {
        &self.workout.name
    }

    /// Rename the workout. The id, once assigned, never changes.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.workout.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.workout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workout.is_empty()
    }

    pub fn is_persisted(&self) -> bool {
        !self.workout.id.is_empty()
    }

    pub fn workout(&self) -> &ExpandedWorkout {
        &self.workout
    }

    pub fn sets(&self) -> &Arc<Vec<ExpandedSet>> {
        &self.workout.sets
    }

    /// Bumped by every structural change (insert, replace, remove).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, id: impl Into<String>, callback: impl Fn(&ExpandedWorkout) + Send + 'static) {
        self.subscribers.subscribe(id, callback);
    }

    pub fn unsubscribe(&mut self, id: &str) {
        self.subscribers.unsubscribe(id);
    }

    pub fn add_exercise(&mut self, exercise_id: &str, position: SetPosition) -> Result<(), BuildError> {
        let exercise = self
            .resolver
            .lookup_exercise(exercise_id)?
            .ok_or_else(|| BuildError::ExerciseNotFound(exercise_id.to_string()))?;
        let len = self.len();

        let mut sets = self.workout.sets.as_ref().clone();
        match position {
            SetPosition::End => sets.push(ExpandedSet::new(exercise, 1)),
            SetPosition::Index(index) => {
                if index > len {
                    return Err(BuildError::OutOfBounds { index, len });
                }
                let count = sets.get(index).map_or(1, |s| s.sets);
                sets.insert(index, ExpandedSet::new(exercise, count));
            }
            SetPosition::Replace(index) => {
                let slot = sets
                    .get_mut(index)
                    .ok_or(BuildError::OutOfBounds { index, len })?;
                slot.exercise = exercise;
            }
            member @ SetPosition::Member { .. } => {
                return Err(BuildError::UnsupportedPosition(member.to_string()));
            }
        }

        self.replace_sets(sets);
        Ok(())
    }

    /// Remove the set at `index`, shifting later sets up.
    pub fn remove_set(&mut self, index: usize) -> Result<ExpandedSet, BuildError> {
        let len = self.len();
        if index >= len {
            return Err(BuildError::OutOfBounds { index, len });
        }

        let mut sets = self.workout.sets.as_ref().clone();
        let removed = sets.remove(index);
        self.replace_sets(sets);
        Ok(removed)
    }

    /// Change the count of one set in place. The count must lie in
    /// `1..=MAX_SET_COUNT`.
    ///
    /// Does not notify subscribers: count edits are already reflected by
    /// the editing UI's local state.
    pub fn update_set_count(&mut self, index: usize, count: u32) -> Result<(), BuildError> {
        let len = self.len();
        if index >= len {
            return Err(BuildError::OutOfBounds { index, len });
        }
        if !(1..=MAX_SET_COUNT).contains(&count) {
            return Err(BuildError::InvalidCount);
        }

        Arc::make_mut(&mut self.workout.sets)[index].sets = count;
        Ok(())
    }

    /// Compact the workout and write it to `workouts`.
    ///
    /// A workout saved for the first time gets its id derived from its name.
    pub fn save(&mut self, workouts: &mut Store<Workout>) -> Result<SavedWorkout, BuildError> {
        if self.workout.name.trim().is_empty() {
            return Err(BuildError::EmptyName);
        }

        if !self.is_persisted() {
            self.workout.id = derive_id(&self.workout.name);
        }

        let workout = self.workout.compress();
        let write = workouts.put(workout.clone())?;
        debug!(workout = %workout.id, sets = workout.sets.len(), "Saved workout");

        Ok(SavedWorkout { workout, write })
    }

    fn replace_sets(&mut self, sets: Vec<ExpandedSet>) {
        self.workout.sets = Arc::new(sets);
        self.revision += 1;
        self.subscribers.notify(&self.workout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Exercise, MuscleGroup, WorkoutSet};
    use crate::storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn exercises() -> HashMap<String, Exercise> {
        [
            Exercise::new("squat", "Squat", [MuscleGroup::Quads, MuscleGroup::Glutes]),
            Exercise::new("bench", "Bench Press", [MuscleGroup::Chest]),
            Exercise::new("row", "Barbell Row", [MuscleGroup::Back]),
            Exercise::new("curl", "Curl", [MuscleGroup::Biceps]),
        ]
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect()
    }

    fn layout<R: ExerciseResolver + ?Sized>(builder: &WorkoutBuilder<'_, R>) -> Vec<(String, u32)> {
        builder
            .sets()
            .iter()
            .map(|s| (s.exercise.id.clone(), s.sets))
            .collect()
    }

    fn pairs(items: &[(&str, u32)]) -> Vec<(String, u32)> {
        items.iter().map(|(id, n)| (id.to_string(), *n)).collect()
    }

    async fn workout_store() -> Store<Workout> {
        let mut store = Store::new("workouts", Arc::new(MemoryStorage::new()));
        store.initialize().await.unwrap();
        store
    }

    #[test]
    fn test_append_then_remove() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);

        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.add_exercise("bench", SetPosition::End).unwrap();
        assert_eq!(layout(&builder), pairs(&[("squat", 1), ("bench", 1)]));

        builder.remove_set(0).unwrap();
        assert_eq!(layout(&builder), pairs(&[("bench", 1)]));
    }

    #[test]
    fn test_insert_shifts_later_sets_unchanged() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.add_exercise("bench", SetPosition::End).unwrap();
        builder.add_exercise("row", SetPosition::End).unwrap();
        builder.update_set_count(1, 4).unwrap();
        builder.update_set_count(2, 2).unwrap();

        builder.add_exercise("curl", SetPosition::Index(1)).unwrap();

        // New set inherits the count of the set it displaced
        assert_eq!(
            layout(&builder),
            pairs(&[("squat", 1), ("curl", 4), ("bench", 4), ("row", 2)])
        );
    }

    #[test]
    fn test_insert_at_len_appends_with_default_count() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::Index(0)).unwrap();
        builder.update_set_count(0, 5).unwrap();
        builder.add_exercise("bench", SetPosition::Index(1)).unwrap();
        assert_eq!(layout(&builder), pairs(&[("squat", 5), ("bench", 1)]));
    }

    #[test]
    fn test_insert_past_end_fails() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        let err = builder.add_exercise("squat", SetPosition::Index(3)).unwrap_err();
        assert!(matches!(err, BuildError::OutOfBounds { index: 3, len: 0 }));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_replace_keeps_count() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.add_exercise("bench", SetPosition::End).unwrap();
        builder.update_set_count(0, 5).unwrap();

        builder.add_exercise("row", SetPosition::Replace(0)).unwrap();
        assert_eq!(layout(&builder), pairs(&[("row", 5), ("bench", 1)]));

        let err = builder.add_exercise("row", SetPosition::Replace(2)).unwrap_err();
        assert!(matches!(err, BuildError::OutOfBounds { index: 2, len: 2 }));
    }

    #[test]
    fn test_member_position_fails_loudly() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();

        let err = builder
            .add_exercise("bench", SetPosition::Member { set: 0, member: 1 })
            .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedPosition(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_unknown_exercise_fails() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        let err = builder.add_exercise("deadlift", SetPosition::End).unwrap_err();
        assert!(matches!(err, BuildError::ExerciseNotFound(id) if id == "deadlift"));
    }

    #[test]
    fn test_update_count_out_of_bounds_leaves_sets_untouched() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.add_exercise("bench", SetPosition::End).unwrap();
        let before = layout(&builder);

        let err = builder.update_set_count(5, 3).unwrap_err();
        assert!(matches!(err, BuildError::OutOfBounds { index: 5, len: 2 }));
        assert_eq!(layout(&builder), before);

        assert!(matches!(builder.update_set_count(0, 0), Err(BuildError::InvalidCount)));
    }

    #[test]
    fn test_update_count_above_limit_rejected() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();

        builder.update_set_count(0, MAX_SET_COUNT).unwrap();
        for count in [MAX_SET_COUNT + 1, u32::MAX] {
            let err = builder.update_set_count(0, count).unwrap_err();
            assert!(matches!(err, BuildError::InvalidCount));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(layout(&builder), pairs(&[("squat", MAX_SET_COUNT)]));
    }

    #[test]
    fn test_remove_out_of_bounds_fails() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        assert!(matches!(builder.remove_set(0), Err(BuildError::OutOfBounds { index: 0, len: 0 })));
    }

    #[test]
    fn test_structural_edits_replace_sequence_identity() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.add_exercise("squat", SetPosition::End).unwrap();

        let before = builder.sets().clone();
        let revision = builder.revision();
        builder.add_exercise("bench", SetPosition::End).unwrap();

        assert!(!Arc::ptr_eq(&before, builder.sets()));
        assert_eq!(before.len(), 1);
        assert_eq!(builder.revision(), revision + 1);
    }

    #[test]
    fn test_count_updates_do_not_notify() {
        let resolver = exercises();
        let mut builder = WorkoutBuilder::empty(&resolver);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        builder.subscribe("editor", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.add_exercise("bench", SetPosition::End).unwrap();
        builder.update_set_count(0, 3).unwrap();
        builder.remove_set(1).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(builder.revision(), 3);
    }

    #[tokio::test]
    async fn test_save_requires_name() {
        let resolver = exercises();
        let mut workouts = workout_store().await;
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.set_name("   ");

        assert!(matches!(builder.save(&mut workouts), Err(BuildError::EmptyName)));
        assert!(workouts.is_empty());
    }

    #[tokio::test]
    async fn test_save_derives_id_once() {
        let resolver = exercises();
        let mut workouts = workout_store().await;
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.set_name("  Leg   Day");
        builder.add_exercise("squat", SetPosition::End).unwrap();
        builder.update_set_count(0, 5).unwrap();

        let saved = builder.save(&mut workouts).unwrap();
        saved.write.wait().await.unwrap();
        assert_eq!(saved.workout.id, "leg_day");
        assert_eq!(
            saved.workout.sets,
            vec![WorkoutSet {
                exercise_id: "squat".to_string(),
                sets: 5
            }]
        );

        builder.set_name("Lower Body");
        let renamed = builder.save(&mut workouts).unwrap().workout;
        assert_eq!(renamed.id, "leg_day");
        assert_eq!(workouts.get("leg_day").map(|w| w.name.as_str()), Some("Lower Body"));
        assert_eq!(workouts.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_session_round_trips_through_store() {
        let resolver = exercises();
        let mut workouts = workout_store().await;

        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.set_name("Push");
        builder.add_exercise("bench", SetPosition::End).unwrap();
        builder.add_exercise("curl", SetPosition::End).unwrap();
        builder.update_set_count(0, 4).unwrap();
        let expected = {
            builder.save(&mut workouts).unwrap();
            builder.workout().clone()
        };

        let hydrated = WorkoutBuilder::from_id(&resolver, &workouts, "push").unwrap();
        assert_eq!(hydrated.workout(), &expected);
        assert!(hydrated.is_persisted());
    }

    #[tokio::test]
    async fn test_from_id_missing_workout() {
        let resolver = exercises();
        let workouts = workout_store().await;
        let err = WorkoutBuilder::from_id(&resolver, &workouts, "nope").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_from_id_dangling_exercise_never_returns_builder() {
        let mut resolver = exercises();
        let mut workouts = workout_store().await;

        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.set_name("Pull");
        builder.add_exercise("row", SetPosition::End).unwrap();
        builder.add_exercise("curl", SetPosition::End).unwrap();
        builder.save(&mut workouts).unwrap();
        drop(builder);

        // Deleting the exercise does not touch the stored workout
        resolver.remove("curl");
        let stored = workouts.get("pull").unwrap();
        assert_eq!(stored.exercise_ids().collect::<Vec<_>>(), vec!["row", "curl"]);

        let result = WorkoutBuilder::from_id(&resolver, &workouts, "pull");
        match result {
            Err(BuildError::DanglingReference { workout, exercise }) => {
                assert_eq!(workout, "pull");
                assert_eq!(exercise, "curl");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("builder returned for a dangling workout"),
        }
    }

    #[tokio::test]
    async fn test_save_before_store_initialized_is_persistence_error() {
        let resolver = exercises();
        let mut workouts: Store<Workout> = Store::new("workouts", Arc::new(MemoryStorage::new()));
        let mut builder = WorkoutBuilder::empty(&resolver);
        builder.set_name("Arms");

        let err = builder.save(&mut workouts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
