//! Tree DragDrop Utilities
//!
//! Pointer-driven drag-and-drop for tree views, independent of any UI toolkit.
//! Uses movement threshold to distinguish click from drag, and classifies the
//! drop into a sibling reorder or a reparent.

use tracing::debug;

pub type NodeId = u32;

/// Drop target types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// Pointer is over an item
    Item(NodeId),
    /// Zone below the last root item
    EndZone,
}

/// Computed drop action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropIntent {
    /// Move `active_id` to where `over_id` currently sits, both under `parent_id`
    Reorder {
        parent_id: Option<NodeId>,
        active_id: NodeId,
        over_id: NodeId,
    },
    /// Make `node_id` the last child of `new_parent_id`
    Reparent {
        node_id: NodeId,
        new_parent_id: NodeId,
    },
}

/// Read access to the tree a gesture operates on.
pub trait TreeQuery {
    /// `None` when the node is unknown, `Some(None)` for a root.
    fn parent_of(&self, id: NodeId) -> Option<Option<NodeId>>;

    /// `None` when the node is unknown.
    fn is_task(&self, id: NodeId) -> Option<bool>;

    /// True iff `candidate` sits anywhere below `ancestor`.
    fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool;

    fn last_root(&self) -> Option<NodeId>;
}

/// Gesture phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Pointer pressed on an item but not moved far enough yet
    Pending { id: NodeId, start_x: i32, start_y: i32 },
    Dragging { id: NodeId },
}

/// Movement threshold in pixels to start dragging
const DRAG_THRESHOLD_PX: i32 = 5;

/// Transient DnD state for one tree view
#[derive(Clone, Debug, Default)]
pub struct DndState {
    phase: DragPhase,
    drop_target: Option<DropTarget>,
    reparent_modifier: bool,
    drag_just_ended: bool,
}

impl DndState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn dragging_id(&self) -> Option<NodeId> {
        match self.phase {
            DragPhase::Dragging { id } => Some(id),
            _ => None,
        }
    }

    pub fn pending_id(&self) -> Option<NodeId> {
        match self.phase {
            DragPhase::Pending { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn drop_target(&self) -> Option<DropTarget> {
        self.drop_target
    }

    pub fn reparent_modifier(&self) -> bool {
        self.reparent_modifier
    }

    /// Set after a real drag finishes so the UI can swallow the trailing click
    pub fn drag_just_ended(&self) -> bool {
        self.drag_just_ended
    }

    pub fn clear_drag_just_ended(&mut self) {
        self.drag_just_ended = false;
    }

    /// Pointer pressed on an item. Records a pending drag with start position.
    pub fn press(&mut self, id: NodeId, x: i32, y: i32) {
        if self.phase != DragPhase::Idle {
            return;
        }
        self.phase = DragPhase::Pending {
            id,
            start_x: x,
            start_y: y,
        };
        self.reparent_modifier = false;
    }

    /// Pointer moved. Starts the drag once it leaves the threshold box.
    /// Returns true when this call started the drag.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        if let DragPhase::Pending { id, start_x, start_y } = self.phase {
            let dx = (x - start_x).abs();
            let dy = (y - start_y).abs();
            if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
                self.begin(id);
                return true;
            }
        }
        false
    }

    /// Start dragging without a pointer threshold (keyboard or tests).
    pub fn start_drag(&mut self, id: NodeId) {
        if self.dragging_id().is_none() {
            self.reparent_modifier = false;
            self.begin(id);
        }
    }

    fn begin(&mut self, id: NodeId) {
        debug!(id, "drag started");
        self.phase = DragPhase::Dragging { id };
        self.drop_target = None;
    }

    /// Pointer entered an item
    pub fn enter_item(&mut self, id: NodeId) {
        if let Some(dragging) = self.dragging_id() {
            // Don't allow dropping on self
            if dragging != id {
                self.drop_target = Some(DropTarget::Item(id));
            }
        }
    }

    /// Pointer entered the zone past the last root
    pub fn enter_end_zone(&mut self) {
        if self.dragging_id().is_some() {
            self.drop_target = Some(DropTarget::EndZone);
        }
    }

    pub fn leave(&mut self) {
        if self.dragging_id().is_some() {
            self.drop_target = None;
        }
    }

    /// Reparent modifier pressed or released. Only tracked during a gesture.
    pub fn set_modifier(&mut self, active: bool) {
        if self.phase != DragPhase::Idle {
            self.reparent_modifier = active;
        }
    }

    /// Drag cancelled (escape, pointer left the window). Nothing is dropped.
    pub fn cancel(&mut self) {
        let was_dragging = self.dragging_id().is_some();
        self.reset();
        self.drag_just_ended = was_dragging;
    }

    /// Pointer released. Clears all transient state and returns the drop
    /// decision, if the gesture was a valid one.
    pub fn end_drag<T: TreeQuery + ?Sized>(&mut self, tree: &T) -> Option<DropIntent> {
        let dragging = self.dragging_id();
        let target = self.drop_target;
        // Captured once; later modifier transitions no longer matter
        let modifier = self.reparent_modifier;
        self.reset();

        let dragged = dragging?;
        self.drag_just_ended = true;
        let intent = classify_drop(tree, dragged, target?, modifier);
        debug!(dragged, ?target, modifier, ?intent, "drag ended");
        intent
    }

    /// Whether `id` would accept the dragged node as a new child right now
    pub fn is_valid_reparent_target<T: TreeQuery + ?Sized>(&self, tree: &T, id: NodeId) -> bool {
        match self.dragging_id() {
            Some(dragged) => reparent_allowed(tree, dragged, id),
            None => false,
        }
    }

    fn reset(&mut self) {
        self.phase = DragPhase::Idle;
        self.drop_target = None;
        self.reparent_modifier = false;
    }
}

/// Classify a drop of `dragged` onto `target`.
///
/// With the modifier held the drop is a reparent onto the target item; without
/// it the drop is a reorder among siblings. Disallowed gestures yield `None`.
pub fn classify_drop<T: TreeQuery + ?Sized>(
    tree: &T,
    dragged: NodeId,
    target: DropTarget,
    modifier: bool,
) -> Option<DropIntent> {
    match target {
        // Root level only
        DropTarget::EndZone => {
            if tree.parent_of(dragged)?.is_some() {
                return None;
            }
            let last = tree.last_root()?;
            if last == dragged {
                return None;
            }
            Some(DropIntent::Reorder {
                parent_id: None,
                active_id: dragged,
                over_id: last,
            })
        }
        DropTarget::Item(over) if modifier => {
            if !reparent_allowed(tree, dragged, over) {
                return None;
            }
            Some(DropIntent::Reparent {
                node_id: dragged,
                new_parent_id: over,
            })
        }
        DropTarget::Item(over) => {
            if over == dragged {
                return None;
            }
            let parent = tree.parent_of(dragged)?;
            if tree.parent_of(over)? != parent {
                return None;
            }
            Some(DropIntent::Reorder {
                parent_id: parent,
                active_id: dragged,
                over_id: over,
            })
        }
    }
}

fn reparent_allowed<T: TreeQuery + ?Sized>(tree: &T, dragged: NodeId, target: NodeId) -> bool {
    if dragged == target {
        return false;
    }
    if tree.is_task(target) != Some(false) {
        return false;
    }
    match tree.parent_of(dragged) {
        Some(current) if current == Some(target) => false,
        Some(_) => !tree.is_descendant(dragged, target),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// id -> (parent, is_task), roots in insertion order
    struct MapTree {
        nodes: HashMap<NodeId, (Option<NodeId>, bool)>,
        roots: Vec<NodeId>,
    }

    impl MapTree {
        fn new(entries: &[(NodeId, Option<NodeId>, bool)]) -> Self {
            let nodes = entries.iter().map(|&(id, p, t)| (id, (p, t))).collect();
            let roots = entries.iter().filter(|e| e.1.is_none()).map(|e| e.0).collect();
            Self { nodes, roots }
        }
    }

    impl TreeQuery for MapTree {
        fn parent_of(&self, id: NodeId) -> Option<Option<NodeId>> {
            self.nodes.get(&id).map(|n| n.0)
        }

        fn is_task(&self, id: NodeId) -> Option<bool> {
            self.nodes.get(&id).map(|n| n.1)
        }

        fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool {
            let mut cur = self.parent_of(candidate).flatten();
            while let Some(p) = cur {
                if p == ancestor {
                    return true;
                }
                cur = self.parent_of(p).flatten();
            }
            false
        }

        fn last_root(&self) -> Option<NodeId> {
            self.roots.last().copied()
        }
    }

    // 1 (project) -> 2 (task), 3 (project) -> 4 (task)
    // 10 (project), 11 (task)
    fn sample() -> MapTree {
        MapTree::new(&[
            (1, None, false),
            (2, Some(1), true),
            (3, Some(1), false),
            (4, Some(3), true),
            (10, None, false),
            (11, None, true),
        ])
    }

    fn drag(state: &mut DndState, id: NodeId, over: NodeId, modifier: bool) {
        state.start_drag(id);
        state.set_modifier(modifier);
        state.enter_item(over);
    }

    #[test]
    fn test_press_needs_threshold() {
        let mut dnd = DndState::new();
        dnd.press(2, 100, 100);
        assert_eq!(dnd.pending_id(), Some(2));
        assert!(!dnd.pointer_move(103, 104));
        assert_eq!(dnd.dragging_id(), None);
        assert!(dnd.pointer_move(100, 106));
        assert_eq!(dnd.dragging_id(), Some(2));
    }

    #[test]
    fn test_click_without_move_is_not_a_drop() {
        let tree = sample();
        let mut dnd = DndState::new();
        dnd.press(2, 0, 0);
        dnd.enter_item(3);
        assert_eq!(dnd.end_drag(&tree), None);
        assert!(!dnd.drag_just_ended());
        assert_eq!(dnd.phase(), DragPhase::Idle);
    }

    #[test]
    fn test_reorder_same_parent() {
        let tree = sample();
        let mut dnd = DndState::new();
        drag(&mut dnd, 2, 3, false);
        assert_eq!(
            dnd.end_drag(&tree),
            Some(DropIntent::Reorder {
                parent_id: Some(1),
                active_id: 2,
                over_id: 3
            })
        );
        assert!(dnd.drag_just_ended());
        assert_eq!(dnd.drop_target(), None);
    }

    #[test]
    fn test_cross_parent_without_modifier_is_noop() {
        let tree = sample();
        let mut dnd = DndState::new();
        drag(&mut dnd, 4, 2, false);
        assert_eq!(dnd.end_drag(&tree), None);
    }

    #[test]
    fn test_reparent_with_modifier() {
        let tree = sample();
        let mut dnd = DndState::new();
        drag(&mut dnd, 4, 10, true);
        assert_eq!(
            dnd.end_drag(&tree),
            Some(DropIntent::Reparent {
                node_id: 4,
                new_parent_id: 10
            })
        );
    }

    #[test]
    fn test_reparent_rejections() {
        let tree = sample();
        // onto a task
        assert_eq!(classify_drop(&tree, 4, DropTarget::Item(11), true), None);
        // onto its current parent
        assert_eq!(classify_drop(&tree, 4, DropTarget::Item(3), true), None);
        // onto a descendant
        assert_eq!(classify_drop(&tree, 1, DropTarget::Item(3), true), None);
        // onto itself
        assert_eq!(classify_drop(&tree, 1, DropTarget::Item(1), true), None);
        // unknown nodes
        assert_eq!(classify_drop(&tree, 99, DropTarget::Item(10), true), None);
        assert_eq!(classify_drop(&tree, 4, DropTarget::Item(99), true), None);
    }

    #[test]
    fn test_modifier_captured_at_drop() {
        let tree = sample();
        let mut dnd = DndState::new();
        drag(&mut dnd, 4, 10, false);
        dnd.set_modifier(true);
        let intent = dnd.end_drag(&tree);
        assert!(matches!(intent, Some(DropIntent::Reparent { .. })));
        // Released after the drop: no effect on anything
        dnd.set_modifier(false);
        assert!(!dnd.reparent_modifier());
    }

    #[test]
    fn test_end_zone_root_only() {
        let tree = sample();
        assert_eq!(
            classify_drop(&tree, 1, DropTarget::EndZone, false),
            Some(DropIntent::Reorder {
                parent_id: None,
                active_id: 1,
                over_id: 11
            })
        );
        assert_eq!(classify_drop(&tree, 2, DropTarget::EndZone, false), None);
        assert_eq!(classify_drop(&tree, 11, DropTarget::EndZone, false), None);
    }

    #[test]
    fn test_cannot_target_self() {
        let mut dnd = DndState::new();
        dnd.start_drag(3);
        dnd.enter_item(3);
        assert_eq!(dnd.drop_target(), None);
        dnd.enter_item(2);
        assert_eq!(dnd.drop_target(), Some(DropTarget::Item(2)));
        dnd.leave();
        assert_eq!(dnd.drop_target(), None);
    }

    #[test]
    fn test_cancel_clears_everything() {
        let tree = sample();
        let mut dnd = DndState::new();
        drag(&mut dnd, 4, 10, true);
        dnd.cancel();
        assert_eq!(dnd.phase(), DragPhase::Idle);
        assert_eq!(dnd.drop_target(), None);
        assert!(!dnd.reparent_modifier());
        assert_eq!(dnd.end_drag(&tree), None);
    }

    #[test]
    fn test_valid_reparent_target_flag() {
        let tree = sample();
        let mut dnd = DndState::new();
        assert!(!dnd.is_valid_reparent_target(&tree, 10));
        dnd.start_drag(1);
        assert!(dnd.is_valid_reparent_target(&tree, 10));
        assert!(!dnd.is_valid_reparent_target(&tree, 3));
        assert!(!dnd.is_valid_reparent_target(&tree, 11));
    }
}
