//! Single-session staging objects for composing entities before commit.
//!
//! - `WorkoutBuilder`: edits one workout in expanded form and saves it
//!   back to the workout store in compact form
//! - `LogBuilder`: records the sets performed while doing a workout and
//!   commits them to the history database

pub mod log;
pub mod workout;

pub use log::{LogBuilder, LogEntry, LoggedSet};
pub use workout::{SavedWorkout, SetPosition, WorkoutBuilder};
