use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::new_id;

/// One logged training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercises: Vec<ExerciseItem>,
    #[serde(default)]
    pub session_notes: Vec<Note>,
}

impl Workout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            started_at: Utc::now(),
            ended_at: None,
            exercises: Vec::new(),
            session_notes: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Top-level entry of a workout: a bare exercise or a one-level group of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExerciseItem {
    Exercise(Exercise),
    Group(Group),
}

impl ExerciseItem {
    pub fn instance_id(&self) -> &str {
        match self {
            ExerciseItem::Exercise(e) => &e.instance_id,
            ExerciseItem::Group(g) => &g.instance_id,
        }
    }

    pub fn as_exercise(&self) -> Option<&Exercise> {
        match self {
            ExerciseItem::Exercise(e) => Some(e),
            ExerciseItem::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            ExerciseItem::Group(g) => Some(g),
            ExerciseItem::Exercise(_) => None,
        }
    }

    /// Leaves in display order, descending one level into groups
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        let slice: &[Exercise] = match self {
            ExerciseItem::Exercise(e) => std::slice::from_ref(e),
            ExerciseItem::Group(g) => &g.children,
        };
        slice.iter()
    }
}

impl From<Exercise> for ExerciseItem {
    fn from(e: Exercise) -> Self {
        ExerciseItem::Exercise(e)
    }
}

impl From<Group> for ExerciseItem {
    fn from(g: Group) -> Self {
        ExerciseItem::Group(g)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

/// What a set of this exercise records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
pub enum TrackingKind {
    #[default]
    WeightReps,
    Reps,
    Duration,
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub instance_id: String,
    /// Catalog id of the library exercise this instance was created from
    pub exercise_id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub sets: Vec<Set>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub tracking: TrackingKind,
}

impl Exercise {
    pub fn new(
        exercise_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: new_id(),
            exercise_id: exercise_id.into(),
            name: name.into(),
            category: category.into(),
            sets: Vec::new(),
            notes: None,
            weight_unit: WeightUnit::default(),
            tracking: TrackingKind::default(),
        }
    }

    pub fn with_sets(mut self, sets: Vec<Set>) -> Self {
        self.sets = sets;
        self
    }

    pub fn set(&self, set_id: &str) -> Option<&Set> {
        self.sets.iter().find(|s| s.id == set_id)
    }

    pub fn set_index(&self, set_id: &str) -> Option<usize> {
        self.sets.iter().position(|s| s.id == set_id)
    }

    /// Ids of the sets sharing `drop_set_id`, in display order
    pub fn dropset_members(&self, drop_set_id: &str) -> Vec<&Set> {
        self.sets
            .iter()
            .filter(|s| s.drop_set_id.as_deref() == Some(drop_set_id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum GroupType {
    Superset,
    #[serde(rename = "HIIT")]
    #[strum(serialize = "HIIT")]
    Hiit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub instance_id: String,
    pub group_type: GroupType,
    pub children: Vec<Exercise>,
}

impl Group {
    pub fn new(group_type: GroupType, children: Vec<Exercise>) -> Self {
        Self {
            instance_id: new_id(),
            group_type,
            children,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display)]
pub enum SetType {
    #[default]
    Working,
    Warmup,
    Failure,
}

/// Uniform flavour of a dropset chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
pub enum DropSetType {
    Warmup,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub id: String,
    #[serde(rename = "type", default)]
    pub set_type: SetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_set_id: Option<String>,
    #[serde(default)]
    pub is_warmup: bool,
    #[serde(default)]
    pub is_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_period_seconds: Option<u32>,
    #[serde(default)]
    pub rest_timer_completed: bool,
}

impl Default for Set {
    fn default() -> Self {
        Self {
            id: new_id(),
            set_type: SetType::Working,
            weight: None,
            reps: None,
            duration: None,
            distance: None,
            completed: false,
            drop_set_id: None,
            is_warmup: false,
            is_failure: false,
            rest_period_seconds: None,
            rest_timer_completed: false,
        }
    }
}

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weighted(weight: f64, reps: u32) -> Self {
        Self {
            weight: Some(weight),
            reps: Some(reps),
            ..Self::default()
        }
    }

    pub fn with_rest(mut self, seconds: u32) -> Self {
        self.rest_period_seconds = Some(seconds);
        self
    }

    /// Rest period that would start a countdown, ignoring zero
    pub fn rest_seconds(&self) -> Option<u32> {
        self.rest_period_seconds.filter(|s| *s > 0)
    }

    pub fn dropset_flag(&self) -> Option<DropSetType> {
        match (self.is_warmup, self.is_failure) {
            (true, false) => Some(DropSetType::Warmup),
            (false, true) => Some(DropSetType::Failure),
            _ => None,
        }
    }

    /// Overwrites both per-set flags with the uniform dropset type
    pub fn apply_dropset_type(&mut self, kind: DropSetType) {
        self.is_warmup = kind == DropSetType::Warmup;
        self.is_failure = kind == DropSetType::Failure;
    }
}

/// Reference to a single set inside a specific exercise instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetRef {
    pub exercise_id: String,
    pub set_id: String,
}

impl SetRef {
    pub fn new(exercise_id: impl Into<String>, set_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            set_id: set_id.into(),
        }
    }
}

/// Uniform type of a dropset: only reported when every member shares the same flag
pub fn infer_dropset_type<'a>(members: impl IntoIterator<Item = &'a Set>) -> Option<DropSetType> {
    let mut flags = members.into_iter().map(Set::dropset_flag);
    let first = flags.next()??;
    flags.all(|f| f == Some(first)).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_item_serializes_with_type_tag() {
        let ex = Exercise::new("bench", "Bench Press", "Chest");
        let item = ExerciseItem::Group(Group::new(GroupType::Hiit, vec![ex]));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "group");
        assert_eq!(json["groupType"], "HIIT");
        assert_eq!(json["children"][0]["name"], "Bench Press");
    }

    #[test]
    fn set_type_field_is_named_type() {
        let set = Set {
            set_type: SetType::Warmup,
            ..Set::weighted(60.0, 10)
        };
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["type"], "Warmup");
        assert!(json.get("dropSetId").is_none());
    }

    #[test]
    fn workout_roundtrips_through_json() {
        let mut workout = Workout::new("Push day");
        workout
            .exercises
            .push(Exercise::new("ohp", "Overhead Press", "Shoulders").into());
        workout.session_notes.push(Note::new("felt strong"));
        let text = serde_json::to_string(&workout).unwrap();
        let back: Workout = serde_json::from_str(&text).unwrap();
        assert_eq!(workout, back);
    }

    #[test]
    fn infer_dropset_type_requires_uniform_flags() {
        let mut a = Set::new();
        let mut b = Set::new();
        a.apply_dropset_type(DropSetType::Failure);
        b.apply_dropset_type(DropSetType::Failure);
        assert_eq!(infer_dropset_type([&a, &b]), Some(DropSetType::Failure));

        b.apply_dropset_type(DropSetType::Warmup);
        assert_eq!(infer_dropset_type([&a, &b]), None);

        let plain = Set::new();
        assert_eq!(infer_dropset_type([&plain, &a]), None);
        assert_eq!(infer_dropset_type(Vec::<&Set>::new()), None);
    }

    #[test]
    fn zero_rest_period_does_not_count() {
        assert_eq!(Set::new().with_rest(0).rest_seconds(), None);
        assert_eq!(Set::new().with_rest(45).rest_seconds(), Some(45));
    }

    #[test]
    fn group_type_display() {
        assert_eq!(GroupType::Superset.to_string(), "Superset");
        assert_eq!(GroupType::Hiit.to_string(), "HIIT");
    }
}
