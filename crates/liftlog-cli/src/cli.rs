//! Command-line interface argument parsing for liftlog.
//!
//! Positions on the command line are 1-based (`set 1` is the first set)
//! and converted to 0-based indices while parsing.

use clap::{Parser, Subcommand};
use liftlog_core::WeightUnit;

/// Offline workout tracker: define exercises, compose workouts, log sets.
#[derive(Parser, Debug)]
#[command(name = "liftlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Override the data directory for this run
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the exercise catalog
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Compose and edit workouts
    #[command(subcommand)]
    Workout(WorkoutCommand),

    /// Log a session of a workout
    Log {
        /// Workout id
        workout: String,

        /// A performed set as EXERCISE:REPS@WEIGHT, e.g. `1:5@100`.
        /// EXERCISE is the 1-based position of the exercise in the workout.
        #[arg(short, long = "set", value_parser = parse_logged_set)]
        sets: Vec<LoggedSetArg>,

        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Review logged history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Show or change saved settings
    Config {
        /// Weight unit used when printing sets (kg or lbs)
        #[arg(long)]
        unit: Option<WeightUnit>,

        /// Data directory to use from now on
        #[arg(long)]
        store_dir: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExerciseCommand {
    /// Add an exercise
    Add {
        name: String,
        /// Comma-separated muscle groups, e.g. `chest,triceps`
        #[arg(short, long)]
        muscles: Option<String>,
    },
    /// List exercises
    List {
        /// Only exercises training this muscle group
        #[arg(short, long)]
        muscle: Option<String>,
    },
    /// Rename an exercise and optionally replace its muscle groups
    Rename {
        id: String,
        name: String,
        #[arg(short, long)]
        muscles: Option<String>,
    },
    /// Delete an exercise and all of its history
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum WorkoutCommand {
    /// List workouts
    List,
    /// Show one workout with its exercises
    Show { id: String },
    /// Create a workout from a name and exercise ids
    Create {
        name: String,
        /// Exercise ids, one set group each, in order
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
    },
    /// Add an exercise to a workout
    Add {
        workout: String,
        exercise: String,
        /// Insert at this position instead of appending
        #[arg(long, value_parser = parse_position, conflicts_with = "replace")]
        at: Option<usize>,
        /// Swap the exercise at this position, keeping its set count
        #[arg(long, value_parser = parse_position)]
        replace: Option<usize>,
    },
    /// Remove the set group at a position
    Remove {
        workout: String,
        #[arg(value_parser = parse_position)]
        position: usize,
    },
    /// Change how many sets a set group has
    Count {
        workout: String,
        #[arg(value_parser = parse_position)]
        position: usize,
        count: u32,
    },
    /// Rename a workout (its id stays the same)
    Rename { workout: String, name: String },
    /// Delete a workout
    Delete { workout: String },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// History of one exercise, newest first
    Exercise { id: String },
    /// Logged sessions of one workout, newest first
    Workout { id: String },
    /// Delete one logged session and its entries
    DeleteSession { id: i64 },
    /// Delete one exercise history entry
    DeleteEntry { id: i64 },
    /// Delete all history of one exercise, keeping the exercise
    Clear { exercise: String },
}

/// A `--set` argument after parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggedSetArg {
    pub entry: usize,
    pub reps: u32,
    pub weight: f64,
}

/// Parse a 1-based position into a 0-based index
pub fn parse_position(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a position", s))?;
    n.checked_sub(1)
        .ok_or_else(|| "positions start at 1".to_string())
}

/// Parse `EXERCISE:REPS@WEIGHT`
pub fn parse_logged_set(s: &str) -> Result<LoggedSetArg, String> {
    let (entry, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("expected EXERCISE:REPS@WEIGHT, got '{}'", s))?;
    let (reps, weight) = rest
        .split_once('@')
        .ok_or_else(|| format!("expected REPS@WEIGHT after ':', got '{}'", rest))?;

    let weight_value: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a weight", weight))?;
    if !weight_value.is_finite() || weight_value < 0.0 {
        return Err(format!("'{}' is not a weight", weight));
    }

    Ok(LoggedSetArg {
        entry: parse_position(entry)?,
        reps: reps
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a rep count", reps))?,
        weight: weight_value,
    })
}
