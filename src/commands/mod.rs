//! Backend Command Boundary
//!
//! The persistence collaborator the client talks to. Every call is one async
//! round trip with a uniform `Result<_, BackendError>`; the client never
//! performs I/O itself.

mod node;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NodeId, NodePatch, NodeRecord};

pub use node::CreateNodeArgs;

/// Failure reported by a backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Request aborted: {0}")]
    Aborted(String),
}

/// Persistence operations the tree client relies on
#[async_trait]
pub trait Backend: Send + Sync {
    /// Full flat snapshot of all nodes
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, BackendError>;

    /// Persist the complete sibling order of one level (`None` = roots)
    async fn reorder(&self, parent_id: Option<NodeId>, ordered_ids: &[NodeId]) -> Result<(), BackendError>;

    /// Reparent a node (appended at the end of the new level)
    async fn move_node(&self, node_id: NodeId, new_parent_id: Option<NodeId>) -> Result<(), BackendError>;

    /// Create a node and return its server-assigned id
    async fn create(&self, args: &CreateNodeArgs) -> Result<NodeId, BackendError>;

    async fn update(&self, node_id: NodeId, patch: &NodePatch) -> Result<(), BackendError>;

    /// Delete a node and all of its descendants
    async fn delete(&self, node_id: NodeId) -> Result<(), BackendError>;
}
