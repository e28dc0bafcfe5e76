//! Node Hierarchy Operations
//!
//! Parent-child relationships: listing, moving and display paths.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use project_tree::NodeId;
use rusqlite::params;

use super::node_positioning::{next_position, reindex};
use super::node_repo::{require, row_to_node, NODE_COLUMNS};
use crate::domain::{DomainError, DomainResult, StoredNode};

/// Separator between names in a display path
pub const PATH_SEPARATOR: &str = " / ";

#[async_trait]
pub trait NodeHierarchyOperations {
    /// Children of a parent (`None` = roots) in sibling order
    async fn get_children(&self, parent_id: Option<NodeId>) -> DomainResult<Vec<StoredNode>>;

    /// Reparent a node, appending it after the new siblings. Moving to the
    /// current parent sends the node to the end of its level.
    ///
    /// Rejects task targets and targets inside the node's own subtree.
    async fn move_to(&self, id: NodeId, new_parent_id: Option<NodeId>) -> DomainResult<()>;

    /// All descendants of a node, breadth first
    async fn get_descendants(&self, id: NodeId) -> DomainResult<Vec<StoredNode>>;

    /// Ancestor names joined root first, ending with the node itself
    async fn path_of(&self, id: NodeId) -> DomainResult<String>;
}

#[async_trait]
impl NodeHierarchyOperations for super::node_repo::NodeRepository {
    async fn get_children(&self, parent_id: Option<NodeId>) -> DomainResult<Vec<StoredNode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM nodes WHERE parent_id IS ? ORDER BY sort_order, id",
            NODE_COLUMNS
        ))?;
        let nodes = stmt
            .query_map(params![parent_id], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    async fn move_to(&self, id: NodeId, new_parent_id: Option<NodeId>) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let node = require(&conn, id)?;

        if let Some(target) = new_parent_id {
            if target == id {
                return Err(DomainError::Conflict(format!("Node {} cannot contain itself", id)));
            }
            let parent = require(&conn, target)?;
            if parent.is_task {
                return Err(DomainError::InvalidInput(format!("Task {} cannot have children", target)));
            }
            // Walk up from the target; meeting `id` means a cycle
            let mut cursor = parent.parent_id;
            while let Some(ancestor) = cursor {
                if ancestor == id {
                    return Err(DomainError::Conflict(format!(
                        "Node {} cannot move into its own subtree",
                        id
                    )));
                }
                cursor = require(&conn, ancestor)?.parent_id;
            }
        }

        let tx = conn.transaction()?;
        let position = next_position(&tx, new_parent_id)?;
        tx.execute(
            "UPDATE nodes SET parent_id = ?, sort_order = ?, updated_at = ? WHERE id = ?",
            params![new_parent_id, position, chrono::Utc::now().timestamp_millis(), id],
        )?;
        reindex(&tx, node.parent_id)?;
        tx.commit()?;

        log::debug!("moved node {} from {:?} to {:?}", id, node.parent_id, new_parent_id);
        Ok(())
    }

    async fn get_descendants(&self, id: NodeId) -> DomainResult<Vec<StoredNode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY sort_order, id",
            NODE_COLUMNS
        ))?;
        let mut result = Vec::new();
        let mut to_visit = VecDeque::from([id]);

        while let Some(current) = to_visit.pop_front() {
            let children = stmt
                .query_map(params![current], row_to_node)?
                .collect::<Result<Vec<_>, _>>()?;
            for child in children {
                to_visit.push_back(child.id);
                result.push(child);
            }
        }
        Ok(result)
    }

    async fn path_of(&self, id: NodeId) -> DomainResult<String> {
        let conn = self.conn.lock().await;
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor.filter(|c| seen.insert(*c)) {
            let node = require(&conn, current)?;
            names.push(node.name);
            cursor = node.parent_id;
        }
        names.reverse();
        Ok(names.join(PATH_SEPARATOR))
    }
}

/// Display paths for a whole listing in one pass.
///
/// Nodes whose parent is missing from the listing start their own path.
pub fn compute_paths(nodes: &[StoredNode]) -> HashMap<NodeId, String> {
    let by_id: HashMap<NodeId, &StoredNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut paths = HashMap::with_capacity(nodes.len());

    for node in nodes {
        let mut names = vec![node.name.as_str()];
        let mut cursor = node.parent_id;
        while let Some(parent) = cursor.and_then(|id| by_id.get(&id)) {
            // Corrupt data can hold a cycle; stop after visiting every node once
            if names.len() > nodes.len() {
                break;
            }
            names.push(parent.name.as_str());
            cursor = parent.parent_id;
        }
        names.reverse();
        paths.insert(node.id, names.join(PATH_SEPARATOR));
    }
    paths
}
