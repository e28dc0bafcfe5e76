//! Client Models
//!
//! Data structures matching backend records, plus the linked tree node.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use tree_dragdrop::NodeId;

/// Workflow status of a project or task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => Status::InProgress,
            "done" => Status::Done,
            "archived" => Status::Archived,
            _ => Status::Todo,
        }
    }
}

/// Flat node record as delivered by a server snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub is_task: bool,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NodeRecord {
    pub fn new(id: NodeId, name: impl Into<String>, parent_id: Option<NodeId>, is_task: bool) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            is_task,
            status: Status::Todo,
            path: String::new(),
            sort_order: 0,
            deadline: None,
            meta_description: None,
            notes: None,
        }
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// A project (folder) or task (leaf) linked into the forest
///
/// Projects always carry `children` (possibly empty); tasks never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub is_task: bool,
    /// Parent node ID (None = root level)
    pub parent_id: Option<NodeId>,
    pub status: Status,
    /// Position within siblings (for ordering)
    pub sort_order: i32,
    pub deadline: Option<NaiveDate>,
    pub meta_description: Option<String>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    /// Unlinked node for a record; children are attached by the tree index
    pub fn from_record(record: &NodeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            is_task: record.is_task,
            parent_id: record.parent_id,
            status: record.status,
            sort_order: record.sort_order,
            deadline: record.deadline,
            meta_description: record.meta_description.clone(),
            notes: record.notes.clone(),
            children: if record.is_task { None } else { Some(Vec::new()) },
        }
    }

    pub fn project(id: NodeId, name: impl Into<String>) -> Self {
        Self::from_record(&NodeRecord::new(id, name, None, false))
    }

    pub fn task(id: NodeId, name: impl Into<String>) -> Self {
        Self::from_record(&NodeRecord::new(id, name, None, true))
    }

    /// Builder helper: attach children, rewriting their parent references
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        if self.is_task {
            return self;
        }
        let id = self.id;
        self.children = Some(
            children
                .into_iter()
                .map(|mut c| {
                    c.parent_id = Some(id);
                    c
                })
                .collect(),
        );
        self
    }

    /// Children in display order; always empty for tasks
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Partial update of a node's descriptive fields.
///
/// `None` leaves a field untouched; for the optional fields `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl NodePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn deadline(deadline: Option<NaiveDate>) -> Self {
        Self {
            deadline: Some(deadline),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.deadline.is_none()
            && self.meta_description.is_none()
            && self.notes.is_none()
    }

    pub fn apply(&self, node: &mut Node) {
        self.apply_to(
            &mut node.name,
            &mut node.status,
            &mut node.deadline,
            &mut node.meta_description,
            &mut node.notes,
        );
    }

    /// Field-level form of `apply` for other representations of a node
    pub fn apply_to(
        &self,
        name: &mut String,
        status: &mut Status,
        deadline: &mut Option<NaiveDate>,
        meta_description: &mut Option<String>,
        notes: &mut Option<String>,
    ) {
        if let Some(value) = &self.name {
            *name = value.clone();
        }
        if let Some(value) = self.status {
            *status = value;
        }
        if let Some(value) = self.deadline {
            *deadline = value;
        }
        if let Some(value) = &self.meta_description {
            *meta_description = value.clone();
        }
        if let Some(value) = &self.notes {
            *notes = value.clone();
        }
    }
}
