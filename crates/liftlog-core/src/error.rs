use thiserror::Error;

use crate::models::MAX_SET_COUNT;

/// Failures of the durable side of a store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store '{0}' used before initialize()")]
    NotInitialized(String),

    #[error("Storage I/O error on slot '{slot}': {source}")]
    Io {
        slot: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error on slot '{slot}': {source}")]
    Serialization {
        slot: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage rejected write to slot '{slot}': {reason}")]
    Rejected { slot: String, reason: String },

    #[error("Background writer for slot '{0}' has shut down")]
    WriterClosed(String),
}

/// Coarse classification used at the outer boundary to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced id is absent at lookup time.
    NotFound,
    /// Bad input from the caller: empty name, out-of-range position, etc.
    Validation,
    /// Durable read/write failed.
    Persistence,
    /// A stored entity references something that no longer exists.
    Integrity,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Exercise with id {0} not found")]
    ExerciseNotFound(String),

    #[error("Workout with id {0} not found")]
    WorkoutNotFound(String),

    #[error("Workout '{workout}' references missing exercise '{exercise}'")]
    DanglingReference { workout: String, exercise: String },

    #[error("Name given to workout was empty")]
    EmptyName,

    #[error("Index out of bounds: {index} (length {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("Set count must be between 1 and {max}", max = MAX_SET_COUNT)]
    InvalidCount,

    #[error("Position not supported: {0}")]
    UnsupportedPosition(String),

    #[error("Could not look up exercise '{exercise}': {source}")]
    Lookup {
        exercise: String,
        #[source]
        source: DatabaseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::ExerciseNotFound(_) | BuildError::WorkoutNotFound(_) => ErrorKind::NotFound,
            BuildError::DanglingReference { .. } => ErrorKind::Integrity,
            BuildError::EmptyName
            | BuildError::OutOfBounds { .. }
            | BuildError::InvalidCount
            | BuildError::UnsupportedPosition(_) => ErrorKind::Validation,
            BuildError::Lookup { .. } | BuildError::Store(_) => ErrorKind::Persistence,
        }
    }

    /// True for errors the UI should treat as "that thing is gone, go back".
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Integrity)
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored value: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Exercise name already exists: {0}")]
    NameTaken(String),

    #[error("Reps and weight are not the same length ({reps} vs {weight})")]
    MismatchedSets { reps: usize, weight: usize },

    #[error("Weight must be a finite, non-negative number, got {0}")]
    InvalidWeight(f64),
}
