//! Core library for liftlog.
//!
//! - `store`: keyed in-memory stores mirrored to durable slots, with
//!   subscriber notification
//! - `builder`: staging objects for editing a workout and logging a session
//! - `database`: SQLite exercise catalog and history
//! - `models`: exercises, workouts (compact and expanded), history records

pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod utils;

pub use builder::{LogBuilder, SetPosition, WorkoutBuilder};
pub use config::{Config, WeightUnit};
pub use database::Database;
pub use error::{BuildError, DatabaseError, ErrorKind, StoreError};
pub use models::{Entity, Exercise, ExpandedWorkout, MuscleGroup, Workout, MAX_SET_COUNT};
pub use resolver::ExerciseResolver;
pub use storage::{FileStorage, MemoryStorage, SlotStorage};
pub use store::{PendingWrite, Store};

/// Durable slot holding the workout store.
pub const WORKOUTS_SLOT: &str = "workouts";
