use std::collections::HashSet;

use tracing::debug;

use crate::model::{Exercise, ExerciseItem, Group, GroupType};
use crate::tree;

fn bare_id(item: &ExerciseItem) -> Option<&str> {
    item.as_exercise().map(|e| e.instance_id.as_str())
}

/// Bundles the selected bare exercises into a new group placed where the
/// first of them was. Exercises already inside a group are not eligible;
/// fewer than two eligible exercises is a no-op.
pub fn create_group(
    items: &[ExerciseItem],
    exercise_ids: &[String],
    group_type: GroupType,
) -> Vec<ExerciseItem> {
    let selected: HashSet<&str> = exercise_ids.iter().map(String::as_str).collect();
    let is_member = |item: &ExerciseItem| bare_id(item).is_some_and(|id| selected.contains(id));

    let children: Vec<Exercise> = items
        .iter()
        .filter(|i| is_member(i))
        .filter_map(|i| i.as_exercise().cloned())
        .collect();
    if children.len() < 2 {
        debug!(selected = children.len(), "group not created: fewer than two exercises");
        return items.to_vec();
    }

    let mut group = Some(Group::new(group_type, children));
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if is_member(item) {
            if let Some(g) = group.take() {
                out.push(g.into());
            }
        } else {
            out.push(item.clone());
        }
    }
    out
}

/// Commits an edit of an existing group.
///
/// `selected` is the full desired membership. Children no longer selected
/// become bare exercises right after the group; selected bare exercises are
/// appended to the group's children. A group left with nothing is removed
/// and its former children stay where it was.
pub fn edit_group(
    items: &[ExerciseItem],
    group_id: &str,
    selected: &[String],
    group_type: GroupType,
) -> Vec<ExerciseItem> {
    let Some(group) = tree::find_group(items, group_id) else {
        debug!(group_id, "group edit ignored: group no longer exists");
        return items.to_vec();
    };
    let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let is_addition = |item: &ExerciseItem| bare_id(item).is_some_and(|id| selected.contains(id));

    let (kept, removed): (Vec<Exercise>, Vec<Exercise>) = group
        .children
        .iter()
        .cloned()
        .partition(|c| selected.contains(c.instance_id.as_str()));
    let mut children = kept;
    children.extend(
        items
            .iter()
            .filter(|i| is_addition(i))
            .filter_map(|i| i.as_exercise().cloned()),
    );

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ExerciseItem::Group(g) if g.instance_id == group_id => {
                if !children.is_empty() {
                    out.push(ExerciseItem::Group(Group {
                        instance_id: g.instance_id.clone(),
                        group_type,
                        children: std::mem::take(&mut children),
                    }));
                }
                out.extend(removed.iter().cloned().map(ExerciseItem::from));
            }
            other if is_addition(other) => {}
            other => out.push(other.clone()),
        }
    }
    out
}

/// Replaces a group by its children, in place
pub fn ungroup(items: &[ExerciseItem], group_id: &str) -> Vec<ExerciseItem> {
    items
        .iter()
        .flat_map(|item| match item {
            ExerciseItem::Group(g) if g.instance_id == group_id => g
                .children
                .iter()
                .cloned()
                .map(ExerciseItem::from)
                .collect::<Vec<_>>(),
            other => vec![other.clone()],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTarget {
    New,
    Existing(String),
}

/// Selection-mode state for building or editing a superset/HIIT group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSelection {
    pub target: GroupTarget,
    pub group_type: GroupType,
    selected: Vec<String>,
}

impl GroupSelection {
    pub fn new(group_type: GroupType) -> Self {
        Self {
            target: GroupTarget::New,
            group_type,
            selected: Vec::new(),
        }
    }

    /// Opens an existing group with its children preselected
    pub fn edit(items: &[ExerciseItem], group_id: &str) -> Option<Self> {
        let group = tree::find_group(items, group_id)?;
        Some(Self {
            target: GroupTarget::Existing(group_id.to_string()),
            group_type: group.group_type,
            selected: group.children.iter().map(|c| c.instance_id.clone()).collect(),
        })
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, exercise_id: &str) -> bool {
        self.selected.iter().any(|id| id == exercise_id)
    }

    pub fn can_select(&self, items: &[ExerciseItem], exercise_id: &str) -> bool {
        if items.iter().filter_map(bare_id).any(|id| id == exercise_id) {
            return true;
        }
        match (&self.target, tree::group_of(items, exercise_id)) {
            (GroupTarget::Existing(target), Some(g)) => &g.instance_id == target,
            _ => false,
        }
    }

    /// Returns whether the selection changed
    pub fn toggle(&mut self, items: &[ExerciseItem], exercise_id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|id| id == exercise_id) {
            self.selected.remove(pos);
            return true;
        }
        if !self.can_select(items, exercise_id) {
            debug!(exercise_id, "exercise not selectable for this group");
            return false;
        }
        self.selected.push(exercise_id.to_string());
        true
    }

    pub fn can_commit(&self) -> bool {
        match self.target {
            GroupTarget::New => self.selected.len() >= 2,
            GroupTarget::Existing(_) => true,
        }
    }

    pub fn commit(self, items: &[ExerciseItem]) -> Vec<ExerciseItem> {
        match &self.target {
            GroupTarget::New => create_group(items, &self.selected, self.group_type),
            GroupTarget::Existing(id) => edit_group(items, id, &self.selected, self.group_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(id: &str) -> Exercise {
        Exercise {
            instance_id: id.to_string(),
            ..Exercise::new(id, id.to_uppercase(), "Test")
        }
    }

    fn group(id: &str, children: &[&str]) -> ExerciseItem {
        ExerciseItem::Group(Group {
            instance_id: id.to_string(),
            group_type: GroupType::Superset,
            children: children.iter().map(|c| ex(c)).collect(),
        })
    }

    fn strings(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// Top level rendered as "a", "g[b,c]"
    fn shape(items: &[ExerciseItem]) -> Vec<String> {
        items
            .iter()
            .map(|i| match i {
                ExerciseItem::Exercise(e) => e.instance_id.clone(),
                ExerciseItem::Group(g) => format!(
                    "g[{}]",
                    g.children
                        .iter()
                        .map(|c| c.instance_id.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                ),
            })
            .collect()
    }

    #[test]
    fn test_create_group_at_first_member() {
        let items: Vec<ExerciseItem> = vec![ex("a").into(), ex("b").into(), ex("c").into()];
        let out = create_group(&items, &strings(&["c", "a"]), GroupType::Hiit);
        assert_eq!(shape(&out), vec!["g[a,c]", "b"]);
        assert_eq!(out[0].as_group().unwrap().group_type, GroupType::Hiit);
    }

    #[test]
    fn test_create_group_needs_two() {
        let items: Vec<ExerciseItem> = vec![ex("a").into(), group("g", &["b", "c"])];
        let out = create_group(&items, &strings(&["a", "b"]), GroupType::Superset);
        assert_eq!(out, items);
    }

    #[test]
    fn test_edit_group_remove_and_add() {
        let items: Vec<ExerciseItem> = vec![
            ex("x").into(),
            group("g", &["a", "b", "c"]),
            ex("y").into(),
        ];
        let out = edit_group(&items, "g", &strings(&["a", "c", "x"]), GroupType::Superset);
        assert_eq!(shape(&out), vec!["g[a,c,x]", "b", "y"]);
    }

    #[test]
    fn test_edit_group_allows_single_member() {
        let items: Vec<ExerciseItem> = vec![group("g", &["a", "b"])];
        let out = edit_group(&items, "g", &strings(&["a"]), GroupType::Hiit);
        assert_eq!(shape(&out), vec!["g[a]", "b"]);
        assert_eq!(out[0].as_group().unwrap().group_type, GroupType::Hiit);
    }

    #[test]
    fn test_edit_group_removing_all_destroys_it() {
        let items: Vec<ExerciseItem> = vec![ex("z").into(), group("g", &["a", "b"])];
        let out = edit_group(&items, "g", &[], GroupType::Superset);
        assert_eq!(shape(&out), vec!["z", "a", "b"]);
    }

    #[test]
    fn test_edit_missing_group_is_noop() {
        let items: Vec<ExerciseItem> = vec![ex("a").into()];
        assert_eq!(edit_group(&items, "nope", &strings(&["a"]), GroupType::Superset), items);
    }

    #[test]
    fn test_ungroup() {
        let items: Vec<ExerciseItem> =
            vec![ex("z").into(), group("g", &["a", "b"]), ex("y").into()];
        assert_eq!(shape(&ungroup(&items, "g")), vec!["z", "a", "b", "y"]);
    }

    #[test]
    fn test_selection_rules() {
        let items: Vec<ExerciseItem> = vec![
            ex("a").into(),
            group("g1", &["b", "c"]),
            group("g2", &["d", "e"]),
        ];
        let mut new = GroupSelection::new(GroupType::Superset);
        assert!(new.toggle(&items, "a"));
        assert!(!new.toggle(&items, "b"));
        assert!(!new.can_commit());

        let mut edit = GroupSelection::edit(&items, "g1").unwrap();
        assert!(edit.is_selected("b") && edit.is_selected("c"));
        assert!(!edit.toggle(&items, "d"));
        assert!(edit.toggle(&items, "a"));
        assert!(edit.toggle(&items, "b"));
        let out = edit.commit(&items);
        assert_eq!(shape(&out), vec!["g[c,a]", "b", "g[d,e]"]);
    }
}
