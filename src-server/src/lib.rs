//! Project Tree Backend
//!
//! Layered architecture:
//! - domain: Stored entities and errors
//! - repository: SQLite data access
//! - `LocalServer`: the client's `Backend` served from a local database

use std::path::Path;

use async_trait::async_trait;
use project_tree::{Backend, BackendError, CreateNodeArgs, NodeId, NodePatch, NodeRecord};

pub mod domain;
pub mod repository;

use domain::{DomainError, StoredNode};
use repository::{compute_paths, init_db, NodeHierarchyOperations, NodePositioningOperations, NodeRepository, Repository};

impl From<DomainError> for BackendError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => BackendError::NotFound(msg),
            DomainError::InvalidInput(msg) | DomainError::Conflict(msg) => BackendError::Rejected(msg),
            DomainError::Internal(msg) => BackendError::Internal(msg),
        }
    }
}

/// Persistence collaborator backed by a SQLite file
#[derive(Clone)]
pub struct LocalServer {
    nodes: NodeRepository,
}

impl LocalServer {
    pub async fn open(db_path: &Path) -> Result<Self, DomainError> {
        let state = init_db(db_path).await?;
        Ok(Self {
            nodes: NodeRepository::new(state.conn),
        })
    }

    /// Populate an empty database with a small starter tree.
    /// Returns whether anything was written.
    pub async fn seed_if_empty(&self) -> Result<bool, DomainError> {
        if !self.nodes.list().await?.is_empty() {
            return Ok(false);
        }
        let work = self.nodes.create(&StoredNode::new("Work", false, None)).await?;
        let launch = self.nodes.create(&StoredNode::new("Launch", false, Some(work.id))).await?;
        for name in ["Draft announcement", "Review pricing page"] {
            self.nodes.create(&StoredNode::new(name, true, Some(launch.id))).await?;
        }
        self.nodes.create(&StoredNode::new("Weekly report", true, Some(work.id))).await?;
        let home = self.nodes.create(&StoredNode::new("Home", false, None)).await?;
        self.nodes.create(&StoredNode::new("Renew insurance", true, Some(home.id))).await?;
        log::info!("seeded starter tree");
        Ok(true)
    }
}

#[async_trait]
impl Backend for LocalServer {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, BackendError> {
        let nodes = self.nodes.list().await?;
        let mut paths = compute_paths(&nodes);
        Ok(nodes
            .iter()
            .map(|n| n.to_record(paths.remove(&n.id).unwrap_or_default()))
            .collect())
    }

    async fn reorder(&self, parent_id: Option<NodeId>, ordered_ids: &[NodeId]) -> Result<(), BackendError> {
        self.nodes.apply_order(parent_id, ordered_ids).await.map_err(|e| {
            log::warn!("reorder under {:?} failed: {}", parent_id, e);
            BackendError::from(e)
        })
    }

    async fn move_node(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<(), BackendError> {
        self.nodes.move_to(node_id, new_parent_id).await.map_err(|e| {
            log::warn!("move of node {} failed: {}", node_id, e);
            BackendError::from(e)
        })
    }

    async fn create(&self, args: &CreateNodeArgs) -> Result<NodeId, BackendError> {
        let mut node = StoredNode::new(args.name.clone(), args.is_task, args.parent_id);
        node.status = args.status;
        let created = self.nodes.create(&node).await?;
        log::info!("created node {} ({})", created.id, created.name);
        Ok(created.id)
    }

    async fn update(&self, node_id: NodeId, patch: &NodePatch) -> Result<(), BackendError> {
        let mut node = self
            .nodes
            .find_by_id(node_id)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("Node {} not found", node_id)))?;
        node.apply_patch(patch);
        self.nodes.update(&node).await?;
        Ok(())
    }

    async fn delete(&self, node_id: NodeId) -> Result<(), BackendError> {
        self.nodes.delete(node_id).await?;
        log::info!("deleted node {} and its descendants", node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use project_tree::{Status, SyncCoordinator, TrackerConfig};
    use project_tree::tree::get_child_order;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn server() -> Arc<LocalServer> {
        Arc::new(LocalServer::open(&PathBuf::from(":memory:")).await.unwrap())
    }

    #[tokio::test]
    async fn test_seed_once() {
        let server = server().await;
        assert!(server.seed_if_empty().await.unwrap());
        assert!(!server.seed_if_empty().await.unwrap());

        let records = server.list_nodes().await.unwrap();
        assert_eq!(records.len(), 7);
        let draft = records.iter().find(|r| r.name == "Draft announcement").unwrap();
        assert_eq!(draft.path, "Work / Launch / Draft announcement");
    }

    #[tokio::test]
    async fn test_domain_errors_map_to_backend_errors() {
        let server = server().await;
        let task = server.create(&CreateNodeArgs::task("Solo", None)).await.unwrap();

        let rejected = server.move_node(task, Some(task)).await;
        assert!(matches!(rejected, Err(BackendError::Rejected(_))));
        let missing = server.update(99, &NodePatch::rename("x")).await;
        assert!(matches!(missing, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_patch_leaves_other_fields() {
        let server = server().await;
        let id = server.create(&CreateNodeArgs::task("Plan", None)).await.unwrap();
        server.update(id, &NodePatch::status(Status::Done)).await.unwrap();
        server.update(id, &NodePatch::rename("Plan v2")).await.unwrap();

        let record = server.list_nodes().await.unwrap().remove(0);
        assert_eq!(record.name, "Plan v2");
        assert_eq!(record.status, Status::Done);
    }

    #[tokio::test]
    async fn test_coordinator_round_trip() {
        let server = server().await;
        server.seed_if_empty().await.unwrap();
        let sync = SyncCoordinator::new(server.clone(), &TrackerConfig::default());
        sync.refresh().await.unwrap();

        let roots = get_child_order(&sync.forest(), None);
        assert_eq!(roots.len(), 2);
        let (work, home) = (roots[0], roots[1]);

        assert!(sync.move_node(home, Some(work)).await.unwrap());
        sync.wait_idle().await;

        let records = server.list_nodes().await.unwrap();
        let moved = records.iter().find(|r| r.id == home).unwrap();
        assert_eq!(moved.parent_id, Some(work));
        assert_eq!(moved.path, "Work / Home");
        assert_eq!(get_child_order(&sync.forest(), Some(work)).last(), Some(&home));
    }
}
