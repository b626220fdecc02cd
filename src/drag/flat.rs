//! Flat, draggable projection of the exercise tree.
//!
//! The flat list is derived from the tree whenever it is needed and is never
//! stored. A drop hands the reordered list back and the tree is rebuilt from
//! positions alone: an exercise belongs to whichever group header/footer pair
//! encloses it in the final order.

use std::collections::HashSet;

use tracing::trace;

use crate::model::{Exercise, ExerciseItem, Group, GroupType};

#[derive(Debug, Clone, PartialEq)]
pub enum DragItemKind {
    /// Collapsed headers carry their children as ghost rows and move as one unit
    GroupHeader {
        group_type: GroupType,
        collapsed: bool,
        ghosts: Vec<Exercise>,
    },
    GroupFooter,
    Exercise(Exercise),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    /// Stable key for the drag library
    pub key: String,
    pub kind: DragItemKind,
    pub group_id: Option<String>,
    pub is_first_in_group: bool,
    pub is_last_in_group: bool,
}

impl DragItem {
    fn header(group: &Group, collapsed: bool) -> Self {
        Self {
            key: header_key(&group.instance_id),
            kind: DragItemKind::GroupHeader {
                group_type: group.group_type,
                collapsed,
                ghosts: if collapsed {
                    group.children.clone()
                } else {
                    Vec::new()
                },
            },
            group_id: Some(group.instance_id.clone()),
            is_first_in_group: false,
            is_last_in_group: false,
        }
    }

    fn footer(group: &Group) -> Self {
        Self {
            key: footer_key(&group.instance_id),
            kind: DragItemKind::GroupFooter,
            group_id: Some(group.instance_id.clone()),
            is_first_in_group: false,
            is_last_in_group: false,
        }
    }

    fn exercise(exercise: &Exercise, group_id: Option<&str>, first: bool, last: bool) -> Self {
        Self {
            key: exercise.instance_id.clone(),
            kind: DragItemKind::Exercise(exercise.clone()),
            group_id: group_id.map(str::to_string),
            is_first_in_group: first,
            is_last_in_group: last,
        }
    }

    pub fn is_exercise(&self) -> bool {
        matches!(self.kind, DragItemKind::Exercise(_))
    }

    /// Exercises and collapsed group headers can be picked up
    pub fn is_draggable(&self) -> bool {
        matches!(
            self.kind,
            DragItemKind::Exercise(_) | DragItemKind::GroupHeader { collapsed: true, .. }
        )
    }
}

pub fn header_key(group_id: &str) -> String {
    format!("header:{group_id}")
}

pub fn footer_key(group_id: &str) -> String {
    format!("footer:{group_id}")
}

/// Flattens the tree for reordering.
///
/// With `collapsed_group_id` unset every group is expanded into
/// header, children, footer. When set, a group drag is under way: that group
/// and every other group are collapsed to a single header row carrying their
/// children as ghosts, so all rows move as fixed units.
pub fn to_flat_drag_list(
    items: &[ExerciseItem],
    collapsed_group_id: Option<&str>,
) -> Vec<DragItem> {
    match collapsed_group_id {
        None => flatten_collapsed(items, &HashSet::new()),
        Some(_) => {
            let all: HashSet<String> = items
                .iter()
                .filter_map(ExerciseItem::as_group)
                .map(|g| g.instance_id.clone())
                .collect();
            flatten_collapsed(items, &all)
        }
    }
}

/// Flattens with exactly the given groups collapsed
pub fn flatten_collapsed(items: &[ExerciseItem], collapsed: &HashSet<String>) -> Vec<DragItem> {
    let mut out = Vec::new();
    for item in items {
        match item {
            ExerciseItem::Exercise(e) => out.push(DragItem::exercise(e, None, false, false)),
            ExerciseItem::Group(g) if collapsed.contains(&g.instance_id) => {
                out.push(DragItem::header(g, true));
            }
            ExerciseItem::Group(g) => {
                out.push(DragItem::header(g, false));
                let last = g.children.len().saturating_sub(1);
                for (idx, child) in g.children.iter().enumerate() {
                    out.push(DragItem::exercise(
                        child,
                        Some(&g.instance_id),
                        idx == 0,
                        idx == last,
                    ));
                }
                out.push(DragItem::footer(g));
            }
        }
    }
    out
}

struct OpenGroup {
    instance_id: String,
    group_type: GroupType,
    children: Vec<Exercise>,
}

fn close_group(
    open: &mut Option<OpenGroup>,
    deferred: &mut Vec<Group>,
    out: &mut Vec<ExerciseItem>,
) {
    if let Some(g) = open.take() {
        if g.children.is_empty() {
            trace!(group_id = %g.instance_id, "dropping group emptied by drag");
        } else {
            out.push(ExerciseItem::Group(Group {
                instance_id: g.instance_id,
                group_type: g.group_type,
                children: g.children,
            }));
        }
    }
    out.extend(deferred.drain(..).map(ExerciseItem::from));
}

/// Rebuilds the tree from a (possibly reordered) flat list.
///
/// Membership comes from position: exercises between an expanded header and
/// its footer form that group. Groups left without children vanish. Groups
/// cannot nest, so a collapsed group dropped inside another group's span is
/// placed right after that group.
pub fn from_flat_drag_list(flat: &[DragItem]) -> Vec<ExerciseItem> {
    let mut out: Vec<ExerciseItem> = Vec::new();
    let mut open: Option<OpenGroup> = None;
    let mut deferred: Vec<Group> = Vec::new();

    for item in flat {
        match &item.kind {
            DragItemKind::GroupHeader {
                group_type,
                collapsed: true,
                ghosts,
            } => {
                let Some(group_id) = item.group_id.clone() else {
                    trace!(key = %item.key, "header without group id");
                    continue;
                };
                if ghosts.is_empty() {
                    continue;
                }
                let group = Group {
                    instance_id: group_id,
                    group_type: *group_type,
                    children: ghosts.clone(),
                };
                if open.is_some() {
                    deferred.push(group);
                } else {
                    out.push(group.into());
                }
            }
            DragItemKind::GroupHeader { group_type, .. } => {
                let Some(group_id) = item.group_id.clone() else {
                    trace!(key = %item.key, "header without group id");
                    continue;
                };
                close_group(&mut open, &mut deferred, &mut out);
                open = Some(OpenGroup {
                    instance_id: group_id,
                    group_type: *group_type,
                    children: Vec::new(),
                });
            }
            DragItemKind::GroupFooter => {
                let closes_open = open
                    .as_ref()
                    .is_some_and(|g| item.group_id.as_deref() == Some(g.instance_id.as_str()));
                if closes_open {
                    close_group(&mut open, &mut deferred, &mut out);
                } else {
                    trace!(key = %item.key, "ignoring footer outside its group");
                }
            }
            DragItemKind::Exercise(e) => match open.as_mut() {
                Some(g) => g.children.push(e.clone()),
                None => out.push(e.clone().into()),
            },
        }
    }
    close_group(&mut open, &mut deferred, &mut out);
    out
}

/// Recomputes group membership and first/last flags from positions
pub fn retag(flat: Vec<DragItem>) -> Vec<DragItem> {
    let mut open: Option<String> = None;
    let mut out: Vec<DragItem> = flat
        .into_iter()
        .map(|mut item| {
            match &item.kind {
                DragItemKind::GroupHeader { collapsed: false, .. } => open = item.group_id.clone(),
                DragItemKind::GroupFooter => {
                    if open == item.group_id {
                        open = None;
                    }
                }
                DragItemKind::Exercise(_) => item.group_id = open.clone(),
                DragItemKind::GroupHeader { collapsed: true, .. } => {}
            }
            item
        })
        .collect();

    let same_group = |a: &DragItem, b: &DragItem| a.is_exercise() && a.group_id == b.group_id;
    for idx in 0..out.len() {
        if !out[idx].is_exercise() || out[idx].group_id.is_none() {
            out[idx].is_first_in_group = false;
            out[idx].is_last_in_group = false;
            continue;
        }
        let first = idx == 0 || !same_group(&out[idx - 1], &out[idx]);
        let last = idx + 1 == out.len() || !same_group(&out[idx + 1], &out[idx]);
        out[idx].is_first_in_group = first;
        out[idx].is_last_in_group = last;
    }
    out
}

/// What the drag library does on drop: moves one row from `from` to `to`.
/// Only draggable rows move; anything else returns the list unchanged.
pub fn move_item(flat: &[DragItem], from: usize, to: usize) -> Vec<DragItem> {
    if !flat.get(from).is_some_and(DragItem::is_draggable) {
        trace!(from, "move ignored: row is not draggable");
        return flat.to_vec();
    }
    let mut out = flat.to_vec();
    let item = out.remove(from);
    let to = to.min(out.len());
    out.insert(to, item);
    retag(out)
}
