//! Repository Layer
//!
//! Data access abstractions and the SQLite implementation.

mod db;
mod node;
mod traits;


pub use db::{init_db, DbState};
pub use node::{compute_paths, NodeHierarchyOperations, PATH_SEPARATOR, NodePositioningOperations, NodeRepository};
pub use traits::Repository;
