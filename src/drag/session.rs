use std::collections::HashSet;

use tracing::{debug, trace};

use super::flat::{flatten_collapsed, from_flat_drag_list, header_key, DragItem};
use crate::model::ExerciseItem;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Exercise(String),
    Group(String),
}

impl DragTarget {
    /// Key of the row the finger holds
    pub fn key(&self) -> String {
        match self {
            DragTarget::Exercise(id) => id.clone(),
            DragTarget::Group(id) => header_key(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Waiting for the layout measured after `generation` to settle
    Preparing { target: DragTarget, generation: u64 },
    Dragging { target: DragTarget, group_collapsed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemLayout {
    pub key: String,
    /// Offset from the top of the list content
    pub y: f64,
    pub height: f64,
}

/// Row geometry reported by the list once a re-measure has finished
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub generation: u64,
    pub viewport_height: f64,
    pub scroll_offset: f64,
    pub items: Vec<ItemLayout>,
}

impl LayoutSnapshot {
    fn item(&self, key: &str) -> Option<&ItemLayout> {
        self.items.iter().find(|i| i.key == key)
    }
}

/// Instructions for the view layer, applied in order
#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    MeasureLayout { generation: u64 },
    ScrollTo { offset: f64 },
    /// Shift the collapsed header by `dy` so it stays under the finger
    AlignHeader { dy: f64 },
    BeginDrag { key: String, index: usize },
}

/// Ephemeral drag state: Idle -> Preparing -> Dragging -> Idle.
///
/// Never touches the tree until [`DragSession::drop`] hands back a rebuilt one.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    phase: DragPhase,
    touch: Option<(String, Point)>,
    pointer: Option<Point>,
    collapsed: HashSet<String>,
    pre_drag_collapsed: HashSet<String>,
    generation: u64,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == DragPhase::Idle
    }

    pub fn is_collapsed(&self, group_id: &str) -> bool {
        self.collapsed.contains(group_id)
    }

    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    /// Rows to render for the current collapse state
    pub fn flat_items(&self, items: &[ExerciseItem]) -> Vec<DragItem> {
        flatten_collapsed(items, &self.collapsed)
    }

    /// Touch down: remember where the finger is against the row's key
    pub fn press(&mut self, key: impl Into<String>, at: Point) {
        if self.is_idle() {
            self.touch = Some((key.into(), at));
        }
    }

    pub fn long_press_exercise(&mut self, instance_id: &str) -> Vec<DragEffect> {
        self.prepare(DragTarget::Exercise(instance_id.to_string()))
    }

    /// Collapses every group before the measure request goes out, so the
    /// settled layout already describes the rows that will be dragged.
    /// The held group's children turn into ghost rows.
    pub fn long_press_group(
        &mut self,
        items: &[ExerciseItem],
        group_id: &str,
    ) -> Vec<DragEffect> {
        if !self.is_idle() {
            return Vec::new();
        }
        self.pre_drag_collapsed = self.collapsed.clone();
        self.collapsed.insert(group_id.to_string());
        self.collapsed.extend(
            items
                .iter()
                .filter_map(ExerciseItem::as_group)
                .map(|g| g.instance_id.clone()),
        );
        self.prepare(DragTarget::Group(group_id.to_string()))
    }

    fn prepare(&mut self, target: DragTarget) -> Vec<DragEffect> {
        if !self.is_idle() {
            trace!(?target, "drag already in progress");
            return Vec::new();
        }
        if matches!(target, DragTarget::Exercise(_)) {
            self.pre_drag_collapsed = self.collapsed.clone();
        }
        self.generation += 1;
        let generation = self.generation;
        debug!(?target, generation, "preparing drag");
        self.phase = DragPhase::Preparing { target, generation };
        vec![DragEffect::MeasureLayout { generation }]
    }

    /// The list finished laying out. Only the snapshot answering the latest
    /// measure request starts the drag; anything older is ignored.
    pub fn layout_settled(
        &mut self,
        items: &[ExerciseItem],
        layout: &LayoutSnapshot,
    ) -> Vec<DragEffect> {
        let target = match &self.phase {
            DragPhase::Preparing { target, generation } if *generation == layout.generation => {
                target.clone()
            }
            _ => {
                trace!(generation = layout.generation, "ignoring stale layout");
                return Vec::new();
            }
        };

        let group_drag = matches!(target, DragTarget::Group(_));
        let key = target.key();
        let flat = self.flat_items(items);
        let (Some(index), Some(row)) = (flat.iter().position(|i| i.key == key), layout.item(&key))
        else {
            debug!(%key, "drag target vanished before layout settled");
            self.cancel();
            return Vec::new();
        };

        let offset = (row.y + row.height / 2.0 - layout.viewport_height / 2.0).max(0.0);
        let mut effects = vec![DragEffect::ScrollTo { offset }];
        if group_drag {
            let finger = self
                .touch
                .as_ref()
                .filter(|(k, _)| *k == key)
                .map(|(_, p)| p.y)
                .unwrap_or(row.y - layout.scroll_offset + row.height / 2.0);
            let header_center = row.y - offset + row.height / 2.0;
            effects.push(DragEffect::AlignHeader {
                dy: finger - header_center,
            });
        }
        effects.push(DragEffect::BeginDrag { key, index });

        self.phase = DragPhase::Dragging {
            target,
            group_collapsed: group_drag,
        };
        effects
    }

    /// High-frequency finger updates only move ghosts around
    pub fn pointer_moved(&mut self, at: Point) {
        if matches!(self.phase, DragPhase::Dragging { .. }) {
            self.pointer = Some(at);
        }
    }

    /// Confirms the drop and returns the rebuilt tree
    pub fn drop(&mut self, new_order: &[DragItem]) -> Option<Vec<ExerciseItem>> {
        if !matches!(self.phase, DragPhase::Dragging { .. }) {
            trace!("drop without an active drag");
            return None;
        }
        let rebuilt = from_flat_drag_list(new_order);
        self.reset();
        Some(rebuilt)
    }

    /// Abandons the drag and restores the collapse state from before it began
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!("drag cancelled");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.collapsed = std::mem::take(&mut self.pre_drag_collapsed);
        self.phase = DragPhase::Idle;
        self.touch = None;
        self.pointer = None;
    }
}
