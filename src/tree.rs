//! Pure edits over the exercise tree.
//!
//! Every function takes the current tree by reference and returns a new one.
//! Ids that no longer exist (the item was deleted while an edit was pending)
//! leave the tree unchanged instead of failing.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::trace;

use crate::model::{Exercise, ExerciseItem, Group, Set, SetRef};
use crate::util::new_id;

pub fn find<'a>(items: &'a [ExerciseItem], instance_id: &str) -> Option<&'a Exercise> {
    items
        .iter()
        .flat_map(|item| item.exercises())
        .find(|e| e.instance_id == instance_id)
}

pub fn find_group<'a>(items: &'a [ExerciseItem], group_id: &str) -> Option<&'a Group> {
    items
        .iter()
        .filter_map(ExerciseItem::as_group)
        .find(|g| g.instance_id == group_id)
}

/// The group containing the exercise, if it is grouped at all
pub fn group_of<'a>(items: &'a [ExerciseItem], instance_id: &str) -> Option<&'a Group> {
    items
        .iter()
        .filter_map(ExerciseItem::as_group)
        .find(|g| g.children.iter().any(|c| c.instance_id == instance_id))
}

fn find_mut<'a>(items: &'a mut [ExerciseItem], instance_id: &str) -> Option<&'a mut Exercise> {
    items.iter_mut().find_map(|item| match item {
        ExerciseItem::Exercise(e) => (e.instance_id == instance_id).then_some(e),
        ExerciseItem::Group(g) => g.children.iter_mut().find(|c| c.instance_id == instance_id),
    })
}

pub fn update<F>(items: &[ExerciseItem], instance_id: &str, f: F) -> Vec<ExerciseItem>
where
    F: FnOnce(Exercise) -> Exercise,
{
    let mut out = items.to_vec();
    match find_mut(&mut out, instance_id) {
        Some(slot) => {
            let current = slot.clone();
            *slot = f(current);
        }
        None => trace!(instance_id, "update: no such exercise"),
    }
    out
}

/// Replaces a group; a group returned with no children is removed
pub fn update_group<F>(items: &[ExerciseItem], group_id: &str, f: F) -> Vec<ExerciseItem>
where
    F: FnOnce(Group) -> Group,
{
    let Some(pos) = items
        .iter()
        .position(|i| matches!(i, ExerciseItem::Group(g) if g.instance_id == group_id))
    else {
        trace!(group_id, "update_group: no such group");
        return items.to_vec();
    };
    let mut out = items.to_vec();
    if let ExerciseItem::Group(g) = out.remove(pos) {
        let updated = f(g);
        if !updated.children.is_empty() {
            out.insert(pos, updated.into());
        }
    }
    out
}

/// Removes an exercise (or a whole group when `id` names one).
/// A group emptied by the removal goes with it.
pub fn delete(items: &[ExerciseItem], id: &str) -> Vec<ExerciseItem> {
    items
        .iter()
        .filter_map(|item| match item {
            ExerciseItem::Exercise(e) if e.instance_id == id => None,
            ExerciseItem::Group(g) if g.instance_id == id => None,
            ExerciseItem::Group(g) if g.children.iter().any(|c| c.instance_id == id) => {
                let children: Vec<Exercise> = g
                    .children
                    .iter()
                    .filter(|c| c.instance_id != id)
                    .cloned()
                    .collect();
                if children.is_empty() {
                    trace!(group_id = %g.instance_id, "delete: removing emptied group");
                    None
                } else {
                    Some(ExerciseItem::Group(Group {
                        instance_id: g.instance_id.clone(),
                        group_type: g.group_type,
                        children,
                    }))
                }
            }
            other => Some(other.clone()),
        })
        .collect()
}

/// Copy of an exercise with fresh instance and set ids.
/// Dropset ids are remapped so partitions survive but share nothing with the source.
pub fn deep_copy(exercise: &Exercise) -> Exercise {
    let mut dropsets: HashMap<String, String> = HashMap::new();
    let sets = exercise
        .sets
        .iter()
        .map(|s| Set {
            id: new_id(),
            drop_set_id: s
                .drop_set_id
                .as_ref()
                .map(|d| dropsets.entry(d.clone()).or_insert_with(new_id).clone()),
            ..s.clone()
        })
        .collect();
    Exercise {
        instance_id: new_id(),
        sets,
        ..exercise.clone()
    }
}

/// Inserts a deep copy right after the original, inside its group when grouped
pub fn duplicate(items: &[ExerciseItem], instance_id: &str) -> Vec<ExerciseItem> {
    let mut out = items.to_vec();
    for idx in 0..out.len() {
        match &mut out[idx] {
            ExerciseItem::Exercise(e) if e.instance_id == instance_id => {
                let copy = deep_copy(e);
                out.insert(idx + 1, copy.into());
                return out;
            }
            ExerciseItem::Group(g) => {
                if let Some(pos) = g.children.iter().position(|c| c.instance_id == instance_id) {
                    let copy = deep_copy(&g.children[pos]);
                    g.children.insert(pos + 1, copy);
                    return out;
                }
            }
            _ => {}
        }
    }
    trace!(instance_id, "duplicate: no such exercise");
    out
}

pub fn add_exercise(items: &[ExerciseItem], exercise: Exercise) -> Vec<ExerciseItem> {
    let mut out = items.to_vec();
    out.push(exercise.into());
    out
}

pub fn add_exercise_to_group(
    items: &[ExerciseItem],
    group_id: &str,
    exercise: Exercise,
) -> Vec<ExerciseItem> {
    update_group(items, group_id, |mut g| {
        g.children.push(exercise);
        g
    })
}

pub fn find_set<'a>(items: &'a [ExerciseItem], set: &SetRef) -> Option<&'a Set> {
    find(items, &set.exercise_id).and_then(|e| e.set(&set.set_id))
}

/// Finds which exercise owns a set when only the set id is known
pub fn locate_set(items: &[ExerciseItem], set_id: &str) -> Option<SetRef> {
    items
        .iter()
        .flat_map(|item| item.exercises())
        .find(|e| e.set(set_id).is_some())
        .map(|e| SetRef::new(e.instance_id.clone(), set_id))
}

pub fn update_set<F>(items: &[ExerciseItem], set: &SetRef, f: F) -> Vec<ExerciseItem>
where
    F: FnOnce(Set) -> Set,
{
    update(items, &set.exercise_id, |mut ex| {
        match ex.set_index(&set.set_id) {
            Some(idx) => {
                let current = ex.sets[idx].clone();
                ex.sets[idx] = f(current);
            }
            None => trace!(set_id = %set.set_id, "update_set: no such set"),
        }
        ex
    })
}

/// Appends a set; it never joins the dropset that happens to end the list
pub fn add_set(items: &[ExerciseItem], exercise_id: &str, set: Set) -> Vec<ExerciseItem> {
    insert_set(items, exercise_id, usize::MAX, set)
}

/// Inserts a set at `index` (clamped). A set landing strictly between two
/// members of the same dropset joins it; anywhere else it is ungrouped.
pub fn insert_set(
    items: &[ExerciseItem],
    exercise_id: &str,
    index: usize,
    mut set: Set,
) -> Vec<ExerciseItem> {
    update(items, exercise_id, |mut ex| {
        let index = index.min(ex.sets.len());
        let enclosing = match (index.checked_sub(1).map(|i| &ex.sets[i]), ex.sets.get(index)) {
            (Some(before), Some(after)) if before.drop_set_id == after.drop_set_id => {
                before.drop_set_id.clone()
            }
            _ => None,
        };
        set.drop_set_id = enclosing;
        ex.sets.insert(index, set);
        ex
    })
}

/// Removes a set; a dropset left with a single member is dissolved
pub fn delete_set(items: &[ExerciseItem], set: &SetRef) -> Vec<ExerciseItem> {
    update(items, &set.exercise_id, |mut ex| {
        ex.sets.retain(|s| s.id != set.set_id);
        ex.sets = normalize_dropsets(ex.sets);
        ex
    })
}

/// Flips completion. Un-completing also forgets that its rest was taken.
pub fn toggle_set_completed(items: &[ExerciseItem], set: &SetRef) -> Vec<ExerciseItem> {
    update_set(items, set, |mut s| {
        s.completed = !s.completed;
        if !s.completed {
            s.rest_timer_completed = false;
        }
        s
    })
}

/// Pulls every dropset partition together at the position of its first
/// member, then clears partitions with fewer than two members.
pub fn normalize_dropsets(sets: Vec<Set>) -> Vec<Set> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut out: Vec<Set> = Vec::with_capacity(sets.len());
    for set in &sets {
        match set.drop_set_id.as_deref() {
            None => out.push(set.clone()),
            Some(id) if placed.contains(id) => {}
            Some(id) => {
                placed.insert(id);
                out.extend(
                    sets.iter()
                        .filter(|s| s.drop_set_id.as_deref() == Some(id))
                        .cloned(),
                );
            }
        }
    }

    let singletons: HashSet<String> = out
        .iter()
        .filter_map(|s| s.drop_set_id.as_deref())
        .counts()
        .into_iter()
        .filter(|(_, n)| *n < 2)
        .map(|(id, _)| id.to_string())
        .collect();
    for set in out.iter_mut() {
        if set
            .drop_set_id
            .as_ref()
            .is_some_and(|id| singletons.contains(id))
        {
            set.drop_set_id = None;
        }
    }
    out
}

/// True when every dropset id occupies one contiguous run
pub fn dropsets_contiguous(sets: &[Set]) -> bool {
    let mut closed: HashSet<&str> = HashSet::new();
    let mut current: Option<&str> = None;
    for set in sets {
        let id = set.drop_set_id.as_deref();
        if id != current {
            if let Some(prev) = current {
                closed.insert(prev);
            }
            if id.is_some_and(|i| closed.contains(i)) {
                return false;
            }
            current = id;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupType;

    fn ex(id: &str) -> Exercise {
        Exercise {
            instance_id: id.to_string(),
            ..Exercise::new(format!("cat-{id}"), id.to_uppercase(), "Test")
        }
    }

    fn set(id: &str, drop: Option<&str>) -> Set {
        Set {
            id: id.to_string(),
            drop_set_id: drop.map(str::to_string),
            ..Set::weighted(50.0, 8)
        }
    }

    fn group(id: &str, children: Vec<Exercise>) -> ExerciseItem {
        ExerciseItem::Group(Group {
            instance_id: id.to_string(),
            group_type: GroupType::Superset,
            children,
        })
    }

    fn sample() -> Vec<ExerciseItem> {
        vec![
            ex("a").into(),
            group("g1", vec![ex("b"), ex("c")]),
            ex("d").into(),
        ]
    }

    fn set_ids(sets: &[Set]) -> Vec<&str> {
        sets.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_find_descends_into_groups() {
        let tree = sample();
        assert_eq!(find(&tree, "a").unwrap().name, "A");
        assert_eq!(find(&tree, "c").unwrap().name, "C");
        assert!(find(&tree, "g1").is_none());
        assert!(find(&tree, "zzz").is_none());
    }

    #[test]
    fn test_group_of() {
        let tree = sample();
        assert_eq!(group_of(&tree, "b").unwrap().instance_id, "g1");
        assert!(group_of(&tree, "a").is_none());
    }

    #[test]
    fn test_update_replaces_nested_leaf() {
        let tree = sample();
        let out = update(&tree, "c", |mut e| {
            e.name = "Cable Fly".into();
            e
        });
        assert_eq!(find(&out, "c").unwrap().name, "Cable Fly");
        assert_eq!(find(&tree, "c").unwrap().name, "C");
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let tree = sample();
        let out = update(&tree, "nonexistent", |mut e| {
            e.name.clear();
            e
        });
        assert_eq!(out, tree);
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let tree = sample();
        assert_eq!(delete(&tree, "nonexistent"), tree);
    }

    #[test]
    fn test_delete_removes_emptied_group() {
        let tree = vec![group("g", vec![ex("x")]), ex("y").into()];
        let out = delete(&tree, "x");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].instance_id(), "y");
    }

    #[test]
    fn test_delete_keeps_group_with_remaining_children() {
        let out = delete(&sample(), "b");
        let g = find_group(&out, "g1").unwrap();
        assert_eq!(g.children.len(), 1);
        assert_eq!(g.children[0].instance_id, "c");
    }

    #[test]
    fn test_delete_whole_group() {
        let out = delete(&sample(), "g1");
        let ids: Vec<&str> = out.iter().map(|i| i.instance_id()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_update_group_dropping_all_children_removes_it() {
        let out = update_group(&sample(), "g1", |mut g| {
            g.children.clear();
            g
        });
        assert!(find_group(&out, "g1").is_none());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_deep_copy_remaps_ids() {
        let original = ex("a").with_sets(vec![
            set("s1", Some("d1")),
            set("s2", Some("d1")),
            set("s3", None),
        ]);
        let copy = deep_copy(&original);
        assert_ne!(copy.instance_id, original.instance_id);
        assert!(copy.sets.iter().all(|s| !s.id.starts_with('s')));
        let d = copy.sets[0].drop_set_id.clone().unwrap();
        assert_ne!(d, "d1");
        assert_eq!(copy.sets[1].drop_set_id.as_deref(), Some(d.as_str()));
        assert_eq!(copy.sets[2].drop_set_id, None);
    }

    #[test]
    fn test_duplicate_inside_group() {
        let out = duplicate(&sample(), "b");
        let g = find_group(&out, "g1").unwrap();
        assert_eq!(g.children.len(), 3);
        assert_eq!(g.children[1].name, "B");
        assert_ne!(g.children[1].instance_id, "b");
    }

    #[test]
    fn test_add_exercise_to_missing_group_is_noop() {
        let tree = sample();
        assert_eq!(add_exercise_to_group(&tree, "nope", ex("z")), tree);
    }

    #[test]
    fn test_insert_set_inside_dropset_joins_it() {
        let tree: Vec<ExerciseItem> = vec![ex("a")
            .with_sets(vec![set("s1", Some("d")), set("s2", Some("d")), set("s3", None)])
            .into()];
        let out = insert_set(&tree, "a", 1, set("new", None));
        let sets = &find(&out, "a").unwrap().sets;
        assert_eq!(set_ids(sets), vec!["s1", "new", "s2", "s3"]);
        assert_eq!(sets[1].drop_set_id.as_deref(), Some("d"));

        let out = insert_set(&tree, "a", 2, set("edge", Some("d")));
        let sets = &find(&out, "a").unwrap().sets;
        assert_eq!(sets[2].drop_set_id, None);
    }

    #[test]
    fn test_add_set_appends_ungrouped() {
        let tree: Vec<ExerciseItem> =
            vec![ex("a").with_sets(vec![set("s1", Some("d")), set("s2", Some("d"))]).into()];
        let out = add_set(&tree, "a", set("s3", Some("d")));
        let sets = &find(&out, "a").unwrap().sets;
        assert_eq!(set_ids(sets), vec!["s1", "s2", "s3"]);
        assert_eq!(sets[2].drop_set_id, None);
    }

    #[test]
    fn test_delete_set_dissolves_pair() {
        let tree: Vec<ExerciseItem> = vec![ex("a")
            .with_sets(vec![set("s1", Some("d")), set("s2", Some("d")), set("s3", None)])
            .into()];
        let out = delete_set(&tree, &SetRef::new("a", "s1"));
        let sets = &find(&out, "a").unwrap().sets;
        assert_eq!(set_ids(sets), vec!["s2", "s3"]);
        assert!(sets.iter().all(|s| s.drop_set_id.is_none()));
    }

    #[test]
    fn test_toggle_set_completed_resets_rest_flag() {
        let mut done = set("s1", None);
        done.completed = true;
        done.rest_timer_completed = true;
        let tree: Vec<ExerciseItem> = vec![ex("a").with_sets(vec![done]).into()];
        let out = toggle_set_completed(&tree, &SetRef::new("a", "s1"));
        let s = find_set(&out, &SetRef::new("a", "s1")).unwrap();
        assert!(!s.completed);
        assert!(!s.rest_timer_completed);
    }

    #[test]
    fn test_locate_set() {
        let tree: Vec<ExerciseItem> =
            vec![group("g", vec![ex("a"), ex("b").with_sets(vec![set("s9", None)])])];
        assert_eq!(locate_set(&tree, "s9"), Some(SetRef::new("b", "s9")));
        assert_eq!(locate_set(&tree, "nope"), None);
    }

    #[test]
    fn test_normalize_dropsets_regroups_and_clears_singletons() {
        let sets = vec![
            set("s1", Some("x")),
            set("s2", None),
            set("s3", Some("x")),
            set("s4", Some("y")),
        ];
        let out = normalize_dropsets(sets);
        assert_eq!(set_ids(&out), vec!["s1", "s3", "s2", "s4"]);
        assert_eq!(out[3].drop_set_id, None);
        assert!(dropsets_contiguous(&out));
    }

    #[test]
    fn test_dropsets_contiguous() {
        assert!(dropsets_contiguous(&[
            set("1", Some("a")),
            set("2", Some("a")),
            set("3", None),
            set("4", Some("b")),
        ]));
        assert!(!dropsets_contiguous(&[
            set("1", Some("a")),
            set("2", None),
            set("3", Some("a")),
        ]));
    }
}
