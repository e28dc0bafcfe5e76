//! In-memory backend for tests: records every call, applies writes to its
//! own snapshot, and can fail or hold writes on demand.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::commands::{Backend, BackendError, CreateNodeArgs};
use crate::context::Operation;
use crate::models::{NodeId, NodePatch, NodeRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Reorder(Option<NodeId>, Vec<NodeId>),
    Move(NodeId, Option<NodeId>),
    Create(CreateNodeArgs),
    Update(NodeId, NodePatch),
    Delete(NodeId),
}

#[derive(Default)]
pub struct MockBackend {
    records: Mutex<Vec<NodeRecord>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Operation>>,
    hold: AtomicBool,
    release: Notify,
}

impl MockBackend {
    pub fn new(records: Vec<NodeRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Every call except snapshot pulls
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| *c != Call::List).collect()
    }

    pub fn fail(&self, op: Operation) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Park every write after it is recorded until `release_writes`
    pub fn hold_writes(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release_writes(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    async fn enter(&self, op: Operation, call: Call) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.failing.lock().unwrap().contains(&op) {
            return Err(BackendError::Transport("offline".to_string()));
        }
        Ok(())
    }

    fn next_sort_order(records: &[NodeRecord], parent_id: Option<NodeId>) -> i32 {
        records
            .iter()
            .filter(|r| r.parent_id == parent_id)
            .map(|r| r.sort_order + 1)
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, BackendError> {
        self.calls.lock().unwrap().push(Call::List);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn reorder(&self, parent_id: Option<NodeId>, ordered_ids: &[NodeId]) -> Result<(), BackendError> {
        self.enter(Operation::Reorder, Call::Reorder(parent_id, ordered_ids.to_vec())).await?;
        let mut records = self.records.lock().unwrap();
        for (position, id) in ordered_ids.iter().enumerate() {
            if let Some(r) = records.iter_mut().find(|r| r.id == *id && r.parent_id == parent_id) {
                r.sort_order = position as i32;
            }
        }
        Ok(())
    }

    async fn move_node(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<(), BackendError> {
        self.enter(Operation::Move, Call::Move(node_id, new_parent_id)).await?;
        let mut records = self.records.lock().unwrap();
        let sort_order = Self::next_sort_order(&records, new_parent_id);
        let record = records
            .iter_mut()
            .find(|r| r.id == node_id)
            .ok_or_else(|| BackendError::NotFound(format!("node {}", node_id)))?;
        record.parent_id = new_parent_id;
        record.sort_order = sort_order;
        Ok(())
    }

    async fn create(&self, args: &CreateNodeArgs) -> Result<NodeId, BackendError> {
        self.enter(Operation::Create, Call::Create(args.clone())).await?;
        let mut records = self.records.lock().unwrap();
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let sort_order = Self::next_sort_order(&records, args.parent_id);
        let mut record = NodeRecord::new(id, args.name.clone(), args.parent_id, args.is_task).with_sort_order(sort_order);
        record.status = args.status;
        records.push(record);
        Ok(id)
    }

    async fn update(&self, node_id: NodeId, patch: &NodePatch) -> Result<(), BackendError> {
        self.enter(Operation::Update, Call::Update(node_id, patch.clone())).await?;
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records.iter_mut().find(|r| r.id == node_id) {
            if let Some(name) = &patch.name {
                r.name = name.clone();
            }
            if let Some(status) = patch.status {
                r.status = status;
            }
            if let Some(deadline) = patch.deadline {
                r.deadline = deadline;
            }
        }
        Ok(())
    }

    async fn delete(&self, node_id: NodeId) -> Result<(), BackendError> {
        self.enter(Operation::Delete, Call::Delete(node_id)).await?;
        let mut records = self.records.lock().unwrap();
        let mut doomed = vec![node_id];
        let mut index = 0;
        while index < doomed.len() {
            let parent = doomed[index];
            doomed.extend(records.iter().filter(|r| r.parent_id == Some(parent)).map(|r| r.id));
            index += 1;
        }
        records.retain(|r| !doomed.contains(&r.id));
        Ok(())
    }
}
