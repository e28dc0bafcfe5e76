//! Tree View Drag and Drop
//!
//! Wires pointer events from the tree view into `tree-dragdrop` and hands a
//! valid drop decision to the sync coordinator.

use tracing::debug;
use tree_dragdrop::{DndState, DropIntent};

use crate::models::NodeId;
use crate::sync::SyncCoordinator;
use crate::tree::ForestView;

/// Drag-and-drop controller bound to one coordinator
pub struct TreeController {
    dnd: DndState,
    sync: SyncCoordinator,
}

impl TreeController {
    pub fn new(sync: SyncCoordinator) -> Self {
        Self {
            dnd: DndState::new(),
            sync,
        }
    }

    /// Transient state for visual feedback
    pub fn state(&self) -> &DndState {
        &self.dnd
    }

    pub fn press(&mut self, id: NodeId, x: i32, y: i32) {
        self.dnd.press(id, x, y);
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        self.dnd.pointer_move(x, y)
    }

    pub fn start_drag(&mut self, id: NodeId) {
        self.dnd.start_drag(id);
    }

    pub fn enter_item(&mut self, id: NodeId) {
        self.dnd.enter_item(id);
    }

    pub fn enter_end_zone(&mut self) {
        self.dnd.enter_end_zone();
    }

    pub fn leave(&mut self) {
        self.dnd.leave();
    }

    pub fn set_modifier(&mut self, active: bool) {
        self.dnd.set_modifier(active);
    }

    pub fn cancel(&mut self) {
        self.dnd.cancel();
    }

    pub fn clear_drag_just_ended(&mut self) {
        self.dnd.clear_drag_just_ended();
    }

    pub fn is_valid_reparent_target(&self, id: NodeId) -> bool {
        let forest = self.sync.forest();
        self.dnd.is_valid_reparent_target(&ForestView(&forest), id)
    }

    /// Pointer released: classify against the current forest and dispatch.
    ///
    /// Both kinds of drop are visible in the forest when this returns.
    /// Reorders are persisted after the debounce, moves right away on a
    /// spawned task, so this must run inside a tokio runtime.
    pub fn end_drag(&mut self) -> Option<DropIntent> {
        let forest = self.sync.forest();
        let intent = self.dnd.end_drag(&ForestView(&forest))?;
        match intent {
            DropIntent::Reorder {
                parent_id,
                active_id,
                over_id,
            } => {
                self.sync.reorder(parent_id, active_id, over_id);
            }
            DropIntent::Reparent { node_id, new_parent_id } => {
                // Failures are surfaced as notifications by the coordinator
                if self.sync.start_move(node_id, Some(new_parent_id)).is_none() {
                    debug!(node_id, new_parent_id, "drop move changed nothing");
                }
            }
        }
        Some(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::models::NodeRecord;
    use crate::test_support::{Call, MockBackend};
    use crate::tree::get_child_order;
    use std::time::Duration;

    /// 1 ── 2 (task), 3 ── 4 (task); 10
    fn records() -> Vec<NodeRecord> {
        vec![
            NodeRecord::new(1, "Work", None, false).with_sort_order(0),
            NodeRecord::new(2, "A", Some(1), true).with_sort_order(0),
            NodeRecord::new(3, "Sub", Some(1), false).with_sort_order(1),
            NodeRecord::new(4, "B", Some(3), true).with_sort_order(0),
            NodeRecord::new(10, "Home", None, false).with_sort_order(1),
        ]
    }

    async fn setup() -> (std::sync::Arc<MockBackend>, TreeController) {
        let backend = MockBackend::new(records());
        let sync = SyncCoordinator::new(backend.clone(), &TrackerConfig::default());
        sync.refresh().await.unwrap();
        (backend, TreeController::new(sync))
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_reorders_siblings() {
        let (backend, mut ctl) = setup().await;
        ctl.press(2, 0, 0);
        ctl.pointer_move(0, 20);
        ctl.enter_item(3);
        assert!(matches!(ctl.end_drag(), Some(DropIntent::Reorder { .. })));
        assert_eq!(get_child_order(&ctl.sync.forest(), Some(1)), vec![3, 2]);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.writes(), vec![Call::Reorder(Some(1), vec![3, 2])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modifier_drop_reparents() {
        let (backend, mut ctl) = setup().await;
        ctl.start_drag(4);
        ctl.enter_item(10);
        ctl.set_modifier(true);
        assert!(ctl.end_drag().is_some());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(backend.writes(), vec![Call::Move(4, Some(10))]);
        assert_eq!(get_child_order(&ctl.sync.forest(), Some(10)), vec![4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reparent_drop_is_applied_before_returning() {
        let (_backend, mut ctl) = setup().await;
        ctl.start_drag(4);
        ctl.enter_item(10);
        ctl.set_modifier(true);
        assert!(ctl.end_drag().is_some());

        // no yield to the runtime in between
        assert_eq!(get_child_order(&ctl.sync.forest(), Some(10)), vec![4]);
        assert!(ctl.sync.is_syncing());

        // the next gesture sees the moved node under its new parent
        ctl.start_drag(4);
        ctl.set_modifier(true);
        assert!(!ctl.is_valid_reparent_target(10));
        assert!(ctl.is_valid_reparent_target(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_onto_descendant_is_rejected() {
        let (backend, mut ctl) = setup().await;
        let before = ctl.sync.forest();
        ctl.start_drag(1);
        ctl.set_modifier(true);
        assert!(!ctl.is_valid_reparent_target(3));
        ctl.enter_item(3);
        assert_eq!(ctl.end_drag(), None);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(std::sync::Arc::ptr_eq(&before, &ctl.sync.forest()));
        assert!(backend.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_drop_keeps_pending_reorder() {
        let (backend, mut ctl) = setup().await;
        ctl.start_drag(10);
        ctl.enter_item(1);
        ctl.end_drag();
        assert!(ctl.sync.is_syncing());

        // cross-parent drop without modifier
        ctl.start_drag(4);
        ctl.enter_item(2);
        assert_eq!(ctl.end_drag(), None);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.writes(), vec![Call::Reorder(None, vec![10, 1])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_zone_moves_root_to_last() {
        let (_backend, mut ctl) = setup().await;
        ctl.start_drag(1);
        ctl.enter_end_zone();
        assert!(ctl.end_drag().is_some());
        assert_eq!(get_child_order(&ctl.sync.forest(), None), vec![10, 1]);
    }
}
