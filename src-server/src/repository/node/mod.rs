//! Node Repository Module
//!
//! - node_repo: Core CRUD operations
//! - node_hierarchy: Children, descendants, moves and display paths
//! - node_positioning: Sibling order

mod node_hierarchy;
mod node_positioning;
mod node_repo;

pub use node_hierarchy::{compute_paths, NodeHierarchyOperations, PATH_SEPARATOR};
pub use node_positioning::NodePositioningOperations;
pub use node_repo::NodeRepository;
