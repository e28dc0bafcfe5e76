//! Domain Layer
//!
//! Stored entities and the error type shared by the repositories.

mod entity;
mod node;

pub use entity::{DomainError, DomainResult, Entity};
pub use node::StoredNode;
