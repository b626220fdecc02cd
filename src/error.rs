use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures at the edges of the crate: files, JSON and command-line lookups.
/// The tree engines themselves never fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid workout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no exercise matches {0:?}")]
    ExerciseNotFound(String),
    #[error("no group matches {0:?}")]
    GroupNotFound(String),
    #[error("no set matches {0:?}")]
    SetNotFound(String),
    #[error("no workout at {0:?}; run `liftlog new` first")]
    NoWorkout(PathBuf),
    #[error("index {index} out of range (0..{len})")]
    InvalidIndex { index: usize, len: usize },
}
