// Workout logging core used by the `liftlog` binary.
// tree, grouping, drag and rest_timer are pure; session owns the live state.
pub mod app_dirs;
pub mod config;
pub mod drag;
pub mod error;
pub mod grouping;
pub mod logging;
pub mod model;
pub mod rest_timer;
pub mod runtime;
pub mod session;
pub mod store;
pub mod tree;
pub mod util;

pub use error::{Error, Result};
pub use model::{
    DropSetType, Exercise, ExerciseItem, Group, GroupType, Set, SetRef, SetType, Workout,
};
pub use session::WorkoutSession;
