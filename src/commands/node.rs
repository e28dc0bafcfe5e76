//! Node Command Arguments

use serde::{Deserialize, Serialize};

use crate::models::{Node, NodeId, Status};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeArgs {
    pub name: String,
    pub is_task: bool,
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub status: Status,
}

impl CreateNodeArgs {
    pub fn project(name: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            is_task: false,
            parent_id,
            status: Status::Todo,
        }
    }

    pub fn task(name: impl Into<String>, parent_id: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            is_task: true,
            parent_id,
            status: Status::Todo,
        }
    }

    /// Local node for a freshly created id
    pub fn into_node(self, id: NodeId) -> Node {
        let mut node = if self.is_task {
            Node::task(id, self.name)
        } else {
            Node::project(id, self.name)
        };
        node.parent_id = self.parent_id;
        node.status = self.status;
        node
    }
}
