//! Node Entity
//!
//! A project or task row with its single parent link.

use chrono::NaiveDate;
use project_tree::{NodeId, NodePatch, NodeRecord, Status};
use serde::{Deserialize, Serialize};

use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub name: String,
    pub is_task: bool,
    pub status: Status,
    /// Parent node ID (None = root level)
    pub parent_id: Option<NodeId>,
    /// Position within siblings
    pub sort_order: i32,
    pub deadline: Option<NaiveDate>,
    pub meta_description: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl StoredNode {
    /// Unsaved node; the repository assigns id and position
    pub fn new(name: impl Into<String>, is_task: bool, parent_id: Option<NodeId>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            is_task,
            status: Status::Todo,
            parent_id,
            sort_order: 0,
            deadline: None,
            meta_description: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Apply the descriptive fields of a client patch
    pub fn apply_patch(&mut self, patch: &NodePatch) {
        patch.apply_to(
            &mut self.name,
            &mut self.status,
            &mut self.deadline,
            &mut self.meta_description,
            &mut self.notes,
        );
    }

    /// Wire record with its display path already resolved
    pub fn to_record(&self, path: String) -> NodeRecord {
        NodeRecord {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            is_task: self.is_task,
            status: self.status,
            path,
            sort_order: self.sort_order,
            deadline: self.deadline,
            meta_description: self.meta_description.clone(),
            notes: self.notes.clone(),
        }
    }
}

impl Entity for StoredNode {
    type Id = NodeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
