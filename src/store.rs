use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::model::Workout;

/// Persistence for the workout being logged. The engines never call this;
/// the session's update callback does.
pub trait WorkoutStore {
    fn load(&self) -> Result<Workout>;
    fn save(&self, workout: &Workout) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileWorkoutStore {
    path: PathBuf,
}

impl FileWorkoutStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::workout_path().unwrap_or_else(|| PathBuf::from("liftlog_workout.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileWorkoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkoutStore for FileWorkoutStore {
    fn load(&self) -> Result<Workout> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NoWorkout(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&self, workout: &Workout) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(workout)?;
        fs::write(&self.path, data)?;
        debug!(path = %self.path.display(), "workout saved");
        Ok(())
    }
}
