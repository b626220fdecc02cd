pub mod flat;
pub mod session;

pub use flat::{
    flatten_collapsed, footer_key, from_flat_drag_list, header_key, move_item, retag,
    to_flat_drag_list, DragItem, DragItemKind,
};
pub use session::{
    DragEffect, DragPhase, DragSession, DragTarget, ItemLayout, LayoutSnapshot, Point,
};
