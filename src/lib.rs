//! Project Tree Client Core
//!
//! Client-side mirror of a server-owned project/task tree:
//! - models: Records and linked nodes
//! - tree: Snapshot indexing and pure forest mutators
//! - sync: Optimistic edits, debounced persistence, refresh reconciliation
//! - dnd: Drag-and-drop glue between the tree view and the coordinator
//! - commands: The persistence boundary
//! - filter / store: Search, filtering and search history

pub mod commands;
pub mod config;
pub mod context;
pub mod dnd;
pub mod filter;
pub mod models;
pub mod store;
pub mod sync;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use commands::{Backend, BackendError, CreateNodeArgs};
pub use config::{ConfigError, TrackerConfig};
pub use context::{Notification, Operation};
pub use dnd::TreeController;
pub use filter::{filter_forest, FilterOptions};
pub use models::{Node, NodeId, NodePatch, NodeRecord, Status};
pub use store::{RecentSearches, StoreError};
pub use sync::SyncCoordinator;
pub use tree::{build_tree, Forest, TreeIndex};
pub use tree_dragdrop::{DropIntent, DropTarget};
