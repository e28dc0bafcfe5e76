//! Sync Coordinator
//!
//! Holds the client's mirror of the server tree. Local edits are applied
//! optimistically and persisted in the background:
//! - reorders are debounced, so a burst of drags costs one backend call
//! - moves are written immediately and rolled back to the last server
//!   snapshot when the backend refuses them
//! - server snapshots are ignored while any write is pending, and a
//!   successful write pulls one fresh snapshot once everything has settled
//!
//! All writes go through one FIFO lane, so a move never races a reorder of
//! the same level. Methods that schedule work must be called from within a
//! tokio runtime.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::commands::{Backend, BackendError, CreateNodeArgs};
use crate::config::TrackerConfig;
use crate::context::{Notification, Operation};
use crate::models::{NodeId, NodePatch, NodeRecord, Status};
use crate::tree::{self, Forest};

struct PendingReorder {
    parent_id: Option<NodeId>,
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct SyncState {
    forest: Forest,
    /// Last snapshot actually applied; the rollback target
    last_snapshot: Vec<NodeRecord>,
    in_flight: usize,
    pending_reorder: Option<PendingReorder>,
    generation: u64,
    /// A write succeeded since the last pull
    pull_due: bool,
}

impl SyncState {
    fn is_syncing(&self) -> bool {
        self.in_flight > 0 || self.pending_reorder.is_some()
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    debounce: Duration,
    state: Mutex<SyncState>,
    write_lane: tokio::sync::Mutex<()>,
    forest_tx: watch::Sender<Forest>,
    syncing_tx: watch::Sender<bool>,
    notify_tx: broadcast::Sender<Notification>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn adopt(&self, st: &mut SyncState, forest: Forest) {
        st.forest = forest;
        self.forest_tx.send_replace(Arc::clone(&st.forest));
    }

    fn publish_syncing(&self, st: &SyncState) {
        let syncing = st.is_syncing();
        self.syncing_tx.send_if_modified(|current| {
            if *current == syncing {
                return false;
            }
            *current = syncing;
            true
        });
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.notify_tx.send(notification);
    }

    fn apply_snapshot(&self, records: Vec<NodeRecord>) -> bool {
        let mut st = self.state();
        if st.is_syncing() {
            debug!(count = records.len(), "snapshot dropped while syncing");
            return false;
        }
        let index = tree::build_tree(&records);
        st.last_snapshot = records;
        self.adopt(&mut st, index.roots);
        debug!(count = index.lookup.len(), "snapshot applied");
        true
    }

    async fn pull(&self) -> Result<bool, BackendError> {
        match self.backend.list_nodes().await {
            Ok(records) => Ok(self.apply_snapshot(records)),
            Err(err) => {
                warn!(%err, "refresh failed");
                self.notify(Notification::error(Operation::Refresh, &err));
                Err(err)
            }
        }
    }

    /// (Re)start the debounce timer for a level
    fn schedule_reorder(self: &Arc<Self>, st: &mut SyncState, parent_id: Option<NodeId>) {
        if let Some(prev) = st.pending_reorder.take() {
            prev.timer.abort();
            if prev.parent_id != parent_id {
                // Collapsing would drop the other level's order
                self.issue_reorder(st, prev.parent_id);
            }
        }

        st.generation += 1;
        let generation = st.generation;
        let inner = Arc::clone(self);
        let delay = self.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.flush_reorder(generation);
        });
        st.pending_reorder = Some(PendingReorder {
            parent_id,
            generation,
            timer,
        });
        self.publish_syncing(st);
    }

    fn flush_reorder(self: &Arc<Self>, generation: u64) {
        let mut st = self.state();
        // A superseded timer may still wake up before its abort lands
        let current = st
            .pending_reorder
            .as_ref()
            .is_some_and(|p| p.generation == generation);
        if !current {
            return;
        }
        if let Some(pending) = st.pending_reorder.take() {
            self.issue_reorder(&mut st, pending.parent_id);
        }
        self.publish_syncing(&st);
    }

    fn issue_reorder(self: &Arc<Self>, st: &mut SyncState, parent_id: Option<NodeId>) {
        let order = tree::get_child_order(&st.forest, parent_id);
        info!(?parent_id, count = order.len(), "persisting sibling order");
        st.in_flight += 1;
        let backend = Arc::clone(&self.backend);
        // On failure the optimistic order stays; the next refresh corrects it
        drop(self.spawn_write(
            Operation::Reorder,
            async move { backend.reorder(parent_id, &order).await },
            |forest, _| Arc::clone(forest),
        ));
    }

    /// Run one write on the lane. The caller has already counted it in
    /// `in_flight`.
    fn spawn_write<T, F, S>(
        self: &Arc<Self>,
        op: Operation,
        write: F,
        on_success: S,
    ) -> JoinHandle<Result<T, BackendError>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
        S: FnOnce(&Forest, &T) -> Forest + Send + 'static,
    {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = {
                let _lane = inner.write_lane.lock().await;
                write.await
            };
            if inner.complete(op, &result, on_success) {
                // Reported through notifications already
                let _ = inner.pull().await;
            }
            result
        })
    }

    /// Settle one write. Returns true when a reconciling pull is due: some
    /// write succeeded since the last pull and nothing is pending any more.
    fn complete<T, S>(&self, op: Operation, result: &Result<T, BackendError>, on_success: S) -> bool
    where
        S: FnOnce(&Forest, &T) -> Forest,
    {
        let mut st = self.state();
        st.in_flight = st.in_flight.saturating_sub(1);
        match result {
            Ok(value) => {
                info!(%op, "write succeeded");
                let next = on_success(&st.forest, value);
                if !Arc::ptr_eq(&next, &st.forest) {
                    self.adopt(&mut st, next);
                }
                st.pull_due = true;
                self.notify(Notification::success(op));
            }
            Err(err) => {
                warn!(%op, %err, "write failed");
                if op == Operation::Move {
                    let index = tree::build_tree(&st.last_snapshot);
                    self.adopt(&mut st, index.roots);
                }
                self.notify(Notification::error(op, err));
            }
        }
        self.publish_syncing(&st);
        // The rollback target may predate writes the server already accepted
        let due = st.pull_due && !st.is_syncing();
        if due {
            st.pull_due = false;
        }
        due
    }
}

async fn join<T>(handle: JoinHandle<Result<T, BackendError>>) -> Result<T, BackendError> {
    handle.await.map_err(|e| BackendError::Aborted(e.to_string()))?
}

/// Client-side owner of the forest and its persistence
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(backend: Arc<dyn Backend>, config: &TrackerConfig) -> Self {
        let state = SyncState::default();
        let (forest_tx, _) = watch::channel(Arc::clone(&state.forest));
        let (syncing_tx, _) = watch::channel(false);
        let (notify_tx, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                backend,
                debounce: config.debounce(),
                state: Mutex::new(state),
                write_lane: tokio::sync::Mutex::new(()),
                forest_tx,
                syncing_tx,
                notify_tx,
            }),
        }
    }

    /// Current forest (cheap clone of the shared snapshot)
    pub fn forest(&self) -> Forest {
        Arc::clone(&self.inner.state().forest)
    }

    /// True while a reorder is waiting on its debounce or any write is outstanding
    pub fn is_syncing(&self) -> bool {
        self.inner.state().is_syncing()
    }

    pub fn subscribe_forest(&self) -> watch::Receiver<Forest> {
        self.inner.forest_tx.subscribe()
    }

    pub fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.inner.syncing_tx.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    /// Resolves once no write is pending or outstanding
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.syncing_tx.subscribe();
        let _ = rx.wait_for(|syncing| !*syncing).await;
    }

    /// Offer a server snapshot. Returns false when it was dropped because a
    /// local write is still pending.
    pub fn apply_snapshot(&self, records: Vec<NodeRecord>) -> bool {
        self.inner.apply_snapshot(records)
    }

    /// Pull a snapshot from the backend and offer it
    pub async fn refresh(&self) -> Result<bool, BackendError> {
        self.inner.pull().await
    }

    /// Reorder siblings optimistically and schedule the debounced write.
    /// Returns false when the reorder changed nothing.
    pub fn reorder(&self, parent_id: Option<NodeId>, active_id: NodeId, over_id: NodeId) -> bool {
        let mut st = self.inner.state();
        let next = tree::reorder_within_parent(&st.forest, parent_id, active_id, over_id);
        if Arc::ptr_eq(&next, &st.forest) {
            debug!(?parent_id, active_id, over_id, "reorder is a no-op");
            return false;
        }
        self.inner.adopt(&mut st, next);
        self.inner.schedule_reorder(&mut st, parent_id);
        true
    }

    /// Reparent a node optimistically and persist it right away.
    /// Returns `Ok(false)` when the move changed nothing.
    pub async fn move_node(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<bool, BackendError> {
        match self.start_move(node_id, new_parent_id) {
            Some(write) => {
                join(write).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Synchronous half of `move_node`: the forest already shows the move
    /// when this returns. The handle resolves once the backend answered;
    /// dropping it leaves the write running. `None` for a no-op move.
    pub fn start_move(
        &self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
    ) -> Option<JoinHandle<Result<(), BackendError>>> {
        let mut st = self.inner.state();
        let next = tree::move_node_within_tree(&st.forest, node_id, new_parent_id);
        if Arc::ptr_eq(&next, &st.forest) {
            debug!(node_id, ?new_parent_id, "move is a no-op");
            return None;
        }
        self.inner.adopt(&mut st, next);
        st.in_flight += 1;
        self.inner.publish_syncing(&st);
        info!(node_id, ?new_parent_id, "persisting move");
        let backend = Arc::clone(&self.inner.backend);
        Some(self.inner.spawn_write(
            Operation::Move,
            async move { backend.move_node(node_id, new_parent_id).await },
            |forest, _| Arc::clone(forest),
        ))
    }

    /// Create a node on the backend, then link it locally under its parent
    pub async fn create(&self, args: CreateNodeArgs) -> Result<NodeId, BackendError> {
        let write = {
            let mut st = self.inner.state();
            st.in_flight += 1;
            self.inner.publish_syncing(&st);
            let backend = Arc::clone(&self.inner.backend);
            let request = args.clone();
            let parent_id = args.parent_id;
            self.inner.spawn_write(
                Operation::Create,
                async move { backend.create(&request).await },
                move |forest, id| tree::insert_node(forest, args.into_node(*id), parent_id),
            )
        };
        join(write).await
    }

    /// Patch descriptive fields optimistically, then persist.
    /// Returns `Ok(false)` for unknown nodes or empty patches.
    pub async fn update(&self, node_id: NodeId, patch: NodePatch) -> Result<bool, BackendError> {
        let write = {
            let mut st = self.inner.state();
            let next = tree::update_node(&st.forest, node_id, &patch);
            if Arc::ptr_eq(&next, &st.forest) {
                return Ok(false);
            }
            self.inner.adopt(&mut st, next);
            st.in_flight += 1;
            self.inner.publish_syncing(&st);
            let backend = Arc::clone(&self.inner.backend);
            self.inner.spawn_write(
                Operation::Update,
                async move { backend.update(node_id, &patch).await },
                |forest, _| Arc::clone(forest),
            )
        };
        join(write).await?;
        Ok(true)
    }

    pub async fn rename(&self, node_id: NodeId, name: impl Into<String>) -> Result<bool, BackendError> {
        self.update(node_id, NodePatch::rename(name)).await
    }

    pub async fn set_status(&self, node_id: NodeId, status: Status) -> Result<bool, BackendError> {
        self.update(node_id, NodePatch::status(status)).await
    }

    pub async fn archive(&self, node_id: NodeId) -> Result<bool, BackendError> {
        self.set_status(node_id, Status::Archived).await
    }

    pub async fn set_deadline(&self, node_id: NodeId, deadline: Option<NaiveDate>) -> Result<bool, BackendError> {
        self.update(node_id, NodePatch::deadline(deadline)).await
    }

    /// Remove a node and its subtree optimistically, then persist.
    /// Returns the ids that were removed (empty for unknown nodes).
    pub async fn delete(&self, node_id: NodeId) -> Result<Vec<NodeId>, BackendError> {
        let (removed, write) = {
            let mut st = self.inner.state();
            let removed = tree::collect_subtree_ids(&st.forest, node_id);
            if removed.is_empty() {
                return Ok(removed);
            }
            let next = tree::remove_node(&st.forest, node_id);
            self.inner.adopt(&mut st, next);
            st.in_flight += 1;
            self.inner.publish_syncing(&st);
            let backend = Arc::clone(&self.inner.backend);
            let write = self.inner.spawn_write(
                Operation::Delete,
                async move { backend.delete(node_id).await },
                |forest, _| Arc::clone(forest),
            );
            (removed, write)
        };
        join(write).await?;
        Ok(removed)
    }
}
