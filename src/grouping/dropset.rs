use std::collections::HashSet;

use tracing::debug;

use crate::model::{infer_dropset_type, DropSetType, ExerciseItem, Set};
use crate::tree::{self, dropsets_contiguous, normalize_dropsets};
use crate::util::new_id;

/// Groups the selected, currently ungrouped sets of one exercise into a new
/// dropset. The members are pulled together into one block that starts where
/// the first selected set was. Fewer than two eligible sets is a no-op.
pub fn create_dropset(
    items: &[ExerciseItem],
    exercise_id: &str,
    set_ids: &[String],
    kind: Option<DropSetType>,
) -> Vec<ExerciseItem> {
    let selected: HashSet<&str> = set_ids.iter().map(String::as_str).collect();
    tree::update(items, exercise_id, |mut ex| {
        if let Some(sets) = create_in(&ex.sets, &selected, kind) {
            ex.sets = sets;
        }
        ex
    })
}

fn create_in(
    sets: &[Set],
    selected: &HashSet<&str>,
    kind: Option<DropSetType>,
) -> Option<Vec<Set>> {
    let is_member = |s: &Set| s.drop_set_id.is_none() && selected.contains(s.id.as_str());
    let anchor = sets.iter().position(is_member)?;
    let (block, mut rest): (Vec<Set>, Vec<Set>) = sets.iter().cloned().partition(is_member);
    if block.len() < 2 {
        debug!(selected = block.len(), "dropset not created: fewer than two sets");
        return None;
    }

    let drop_set_id = new_id();
    let block: Vec<Set> = block
        .into_iter()
        .map(|mut s| {
            s.drop_set_id = Some(drop_set_id.clone());
            if let Some(kind) = kind {
                s.apply_dropset_type(kind);
            }
            s
        })
        .collect();
    // Everything before the anchor is unselected, so the anchor index is unchanged in `rest`
    rest.splice(anchor..anchor, block);
    debug_assert!(dropsets_contiguous(&rest));
    Some(rest)
}

/// Commits an edit of an existing dropset.
///
/// `selected` is the full desired membership. Processing order:
/// 1. members no longer selected lose the id and land right after the remaining block;
/// 2. selected ungrouped sets join and are appended to the end of the block;
/// 3. `kind`, when given, is applied to the final membership;
/// 4. a dropset left with one member is dissolved.
pub fn edit_dropset(
    items: &[ExerciseItem],
    exercise_id: &str,
    drop_set_id: &str,
    selected: &[String],
    kind: Option<DropSetType>,
) -> Vec<ExerciseItem> {
    add_to_dropset(items, exercise_id, drop_set_id, drop_set_id, selected, kind)
}

/// Like [`edit_dropset`], but the final membership is moved onto the end of
/// another existing dropset `target` of the same exercise. The source id
/// disappears; deselected members stay behind ungrouped.
pub fn add_to_dropset(
    items: &[ExerciseItem],
    exercise_id: &str,
    source: &str,
    target: &str,
    selected: &[String],
    kind: Option<DropSetType>,
) -> Vec<ExerciseItem> {
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    tree::update(items, exercise_id, |mut ex| {
        if let Some(sets) = edit_in(&ex.sets, source, target, &selected, kind) {
            ex.sets = sets;
        }
        ex
    })
}

/// Ungroups every member of a dropset in place
pub fn dissolve_dropset(
    items: &[ExerciseItem],
    exercise_id: &str,
    drop_set_id: &str,
) -> Vec<ExerciseItem> {
    edit_dropset(items, exercise_id, drop_set_id, &[], None)
}

fn edit_in(
    sets: &[Set],
    source: &str,
    target: &str,
    selected: &HashSet<&str>,
    kind: Option<DropSetType>,
) -> Option<Vec<Set>> {
    let in_group = |s: &Set, id: &str| s.drop_set_id.as_deref() == Some(id);
    let is_addition = |s: &Set| s.drop_set_id.is_none() && selected.contains(s.id.as_str());

    let Some(anchor) = sets.iter().position(|s| in_group(s, source)) else {
        debug!(source, "dropset edit ignored: group no longer exists");
        return None;
    };
    let target_end = if target == source {
        None
    } else {
        match sets.iter().rposition(|s| in_group(s, target)) {
            Some(end) => Some(end),
            None => {
                debug!(target, "dropset edit ignored: target group no longer exists");
                return None;
            }
        }
    };

    let (kept, removed): (Vec<Set>, Vec<Set>) = sets
        .iter()
        .filter(|s| in_group(s, source))
        .cloned()
        .partition(|s| selected.contains(s.id.as_str()));
    let mut moving: Vec<Set> = kept
        .into_iter()
        .chain(sets.iter().filter(|s| is_addition(s)).cloned())
        .map(|mut s| {
            s.drop_set_id = Some(target.to_string());
            s
        })
        .collect();
    let mut removed: Vec<Set> = removed
        .into_iter()
        .map(|mut s| {
            s.drop_set_id = None;
            s
        })
        .collect();

    let mut out: Vec<Set> = Vec::with_capacity(sets.len());
    for (idx, set) in sets.iter().enumerate() {
        if idx == anchor {
            if target_end.is_none() {
                out.append(&mut moving);
            }
            out.append(&mut removed);
        }
        if !in_group(set, source) && !is_addition(set) {
            out.push(set.clone());
        }
        if Some(idx) == target_end {
            out.append(&mut moving);
        }
    }

    if let Some(kind) = kind {
        out.iter_mut()
            .filter(|s| in_group(s, target))
            .for_each(|s| s.apply_dropset_type(kind));
    }
    let out = normalize_dropsets(out);
    debug_assert!(dropsets_contiguous(&out));
    Some(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropsetTarget {
    New,
    Existing(String),
}

/// Selection-mode state for building or editing one exercise's dropset
#[derive(Debug, Clone, PartialEq)]
pub struct DropsetSelection {
    pub exercise_id: String,
    pub target: DropsetTarget,
    pub kind: Option<DropSetType>,
    selected: Vec<String>,
}

impl DropsetSelection {
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            target: DropsetTarget::New,
            kind: None,
            selected: Vec::new(),
        }
    }

    /// Opens an existing dropset with its members preselected.
    /// Returns None when the dropset no longer exists.
    pub fn edit(items: &[ExerciseItem], exercise_id: &str, drop_set_id: &str) -> Option<Self> {
        let exercise = tree::find(items, exercise_id)?;
        let members = exercise.dropset_members(drop_set_id);
        if members.is_empty() {
            return None;
        }
        Some(Self {
            exercise_id: exercise_id.to_string(),
            target: DropsetTarget::Existing(drop_set_id.to_string()),
            kind: infer_dropset_type(members.iter().copied()),
            selected: members.iter().map(|s| s.id.clone()).collect(),
        })
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, set_id: &str) -> bool {
        self.selected.iter().any(|id| id == set_id)
    }

    /// Ungrouped sets can always be picked; grouped ones only when they
    /// belong to the dropset being edited.
    pub fn can_select(&self, items: &[ExerciseItem], set_id: &str) -> bool {
        let Some(set) = tree::find(items, &self.exercise_id).and_then(|e| e.set(set_id)) else {
            return false;
        };
        match (&set.drop_set_id, &self.target) {
            (None, _) => true,
            (Some(id), DropsetTarget::Existing(target)) => id == target,
            (Some(_), DropsetTarget::New) => false,
        }
    }

    /// Returns whether the selection changed
    pub fn toggle(&mut self, items: &[ExerciseItem], set_id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|id| id == set_id) {
            self.selected.remove(pos);
            return true;
        }
        if !self.can_select(items, set_id) {
            debug!(set_id, "set not selectable for this dropset");
            return false;
        }
        self.selected.push(set_id.to_string());
        true
    }

    pub fn can_commit(&self) -> bool {
        match self.target {
            DropsetTarget::New => self.selected.len() >= 2,
            DropsetTarget::Existing(_) => true,
        }
    }

    pub fn commit(self, items: &[ExerciseItem]) -> Vec<ExerciseItem> {
        match &self.target {
            DropsetTarget::New => {
                create_dropset(items, &self.exercise_id, &self.selected, self.kind)
            }
            DropsetTarget::Existing(id) => {
                edit_dropset(items, &self.exercise_id, id, &self.selected, self.kind)
            }
        }
    }

    /// "Add to group": moves the whole selection onto another existing dropset
    pub fn commit_into(
        self,
        items: &[ExerciseItem],
        target_drop_set_id: &str,
    ) -> Vec<ExerciseItem> {
        match &self.target {
            DropsetTarget::Existing(source) => add_to_dropset(
                items,
                &self.exercise_id,
                source,
                target_drop_set_id,
                &self.selected,
                self.kind,
            ),
            DropsetTarget::New => {
                let mut selection = self;
                selection.target = DropsetTarget::Existing(target_drop_set_id.to_string());
                if let Some(ex) = tree::find(items, &selection.exercise_id) {
                    let members = ex
                        .dropset_members(target_drop_set_id)
                        .into_iter()
                        .map(|s| s.id.clone());
                    selection.selected.extend(members);
                }
                selection.commit(items)
            }
        }
    }
}
