pub mod dropset;
pub mod superset;

pub use dropset::{
    add_to_dropset, create_dropset, dissolve_dropset, edit_dropset, DropsetSelection,
    DropsetTarget,
};
pub use superset::{create_group, edit_group, ungroup, GroupSelection, GroupTarget};

use tracing::debug;

use crate::model::{DropSetType, ExerciseItem, GroupType};

/// Which grouping selection, if any, the screen is currently in.
/// Lives outside the workout; cancelling simply drops it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GroupingState {
    #[default]
    Idle,
    Dropset(DropsetSelection),
    Group(GroupSelection),
}

impl GroupingState {
    pub fn is_active(&self) -> bool {
        !matches!(self, GroupingState::Idle)
    }

    pub fn begin_new_dropset(&mut self, exercise_id: &str) {
        *self = GroupingState::Dropset(DropsetSelection::new(exercise_id));
    }

    /// Returns false (and stays idle) when the dropset is gone
    pub fn begin_edit_dropset(
        &mut self,
        items: &[ExerciseItem],
        exercise_id: &str,
        drop_set_id: &str,
    ) -> bool {
        match DropsetSelection::edit(items, exercise_id, drop_set_id) {
            Some(sel) => {
                *self = GroupingState::Dropset(sel);
                true
            }
            None => {
                self.cancel();
                false
            }
        }
    }

    pub fn begin_new_group(&mut self, group_type: GroupType) {
        *self = GroupingState::Group(GroupSelection::new(group_type));
    }

    pub fn begin_edit_group(&mut self, items: &[ExerciseItem], group_id: &str) -> bool {
        match GroupSelection::edit(items, group_id) {
            Some(sel) => {
                *self = GroupingState::Group(sel);
                true
            }
            None => {
                self.cancel();
                false
            }
        }
    }

    /// Toggles a set id (dropset mode) or an exercise instance id (group mode)
    pub fn toggle(&mut self, items: &[ExerciseItem], id: &str) -> bool {
        match self {
            GroupingState::Idle => false,
            GroupingState::Dropset(sel) => sel.toggle(items, id),
            GroupingState::Group(sel) => sel.toggle(items, id),
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        match self {
            GroupingState::Idle => false,
            GroupingState::Dropset(sel) => sel.is_selected(id),
            GroupingState::Group(sel) => sel.is_selected(id),
        }
    }

    pub fn set_dropset_type(&mut self, kind: Option<DropSetType>) {
        if let GroupingState::Dropset(sel) = self {
            sel.kind = kind;
        }
    }

    pub fn set_group_type(&mut self, group_type: GroupType) {
        if let GroupingState::Group(sel) = self {
            sel.group_type = group_type;
        }
    }

    /// Applies the selection and returns to idle. None when nothing changed:
    /// idle, or a new group with fewer than two members.
    pub fn commit(&mut self, items: &[ExerciseItem]) -> Option<Vec<ExerciseItem>> {
        let result = match std::mem::take(self) {
            GroupingState::Idle => return None,
            GroupingState::Dropset(sel) if !sel.can_commit() => {
                debug!(exercise_id = %sel.exercise_id, "dropset selection too small, cancelled");
                None
            }
            GroupingState::Group(sel) if !sel.can_commit() => {
                debug!("group selection too small, cancelled");
                None
            }
            GroupingState::Dropset(sel) => Some(sel.commit(items)),
            GroupingState::Group(sel) => Some(sel.commit(items)),
        };
        result.filter(|out| out.as_slice() != items)
    }

    /// "Add to group" gesture of an open dropset selection
    pub fn commit_into_dropset(
        &mut self,
        items: &[ExerciseItem],
        target_drop_set_id: &str,
    ) -> Option<Vec<ExerciseItem>> {
        match std::mem::take(self) {
            GroupingState::Dropset(sel) => {
                Some(sel.commit_into(items, target_drop_set_id))
                    .filter(|out| out.as_slice() != items)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = GroupingState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Exercise, Set};
    use crate::tree;

    fn workout() -> Vec<ExerciseItem> {
        let sets = ["s1", "s2", "s3"]
            .iter()
            .map(|id| Set {
                id: id.to_string(),
                ..Set::new()
            })
            .collect();
        vec![
            Exercise {
                instance_id: "a".into(),
                ..Exercise::new("row", "Row", "Back")
            }
            .with_sets(sets)
            .into(),
            Exercise {
                instance_id: "b".into(),
                ..Exercise::new("pull", "Pullup", "Back")
            }
            .into(),
        ]
    }

    #[test]
    fn test_cancel_discards_selection() {
        let items = workout();
        let mut state = GroupingState::default();
        state.begin_new_dropset("a");
        state.toggle(&items, "s1");
        state.toggle(&items, "s2");
        assert!(state.is_active());
        state.cancel();
        assert!(!state.is_active());
        assert_eq!(state.commit(&items), None);
    }

    #[test]
    fn test_commit_too_small_resets_to_idle() {
        let items = workout();
        let mut state = GroupingState::default();
        state.begin_new_dropset("a");
        state.toggle(&items, "s1");
        assert_eq!(state.commit(&items), None);
        assert_eq!(state, GroupingState::Idle);
    }

    #[test]
    fn test_commit_dropset_then_group() {
        let items = workout();
        let mut state = GroupingState::default();
        state.begin_new_dropset("a");
        state.toggle(&items, "s1");
        state.toggle(&items, "s3");
        state.set_dropset_type(Some(DropSetType::Warmup));
        let items = state.commit(&items).unwrap();
        let sets = &tree::find(&items, "a").unwrap().sets;
        assert_eq!(sets[0].drop_set_id, sets[1].drop_set_id);
        assert!(sets[0].is_warmup);
        assert_eq!(sets[1].id, "s3");

        state.begin_new_group(GroupType::Superset);
        state.toggle(&items, "a");
        state.toggle(&items, "b");
        state.set_group_type(GroupType::Hiit);
        let items = state.commit(&items).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_group().unwrap().group_type, GroupType::Hiit);
    }

    #[test]
    fn test_begin_edit_on_stale_id_stays_idle() {
        let items = workout();
        let mut state = GroupingState::default();
        assert!(!state.begin_edit_dropset(&items, "a", "gone"));
        assert!(!state.begin_edit_group(&items, "gone"));
        assert!(!state.is_active());
    }
}
