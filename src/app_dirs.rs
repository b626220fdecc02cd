use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the in-progress workout is kept between CLI invocations
    pub fn workout_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("liftlog");
            Some(state_dir.join("workout.json"))
        } else {
            ProjectDirs::from("", "", "liftlog")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("workout.json"))
        }
    }
}
