//! Node Positioning Operations
//!
//! Sibling order within one parent level. Positions are kept dense
//! (0, 1, 2, ...) after every change.

use async_trait::async_trait;
use project_tree::NodeId;
use rusqlite::{params, Connection};

use crate::domain::{DomainError, DomainResult};

#[async_trait]
pub trait NodePositioningOperations {
    /// Persist a complete sibling order for one level.
    ///
    /// Every id must be a child of `parent_id`. Siblings missing from
    /// `ordered_ids` keep their relative order after the listed ones.
    async fn apply_order(&self, parent_id: Option<NodeId>, ordered_ids: &[NodeId]) -> DomainResult<()>;
}

/// Position a newly appended child of `parent_id` takes
pub(super) fn next_position(conn: &Connection, parent_id: Option<NodeId>) -> DomainResult<i32> {
    let position = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM nodes WHERE parent_id IS ?",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(position)
}

pub(super) fn child_ids(conn: &Connection, parent_id: Option<NodeId>) -> DomainResult<Vec<NodeId>> {
    let mut stmt = conn.prepare("SELECT id FROM nodes WHERE parent_id IS ? ORDER BY sort_order, id")?;
    let ids = stmt
        .query_map(params![parent_id], |row| row.get(0))?
        .collect::<Result<Vec<NodeId>, _>>()?;
    Ok(ids)
}

fn write_positions(conn: &Connection, ids: &[NodeId]) -> DomainResult<()> {
    let now = chrono::Utc::now().timestamp_millis();
    for (position, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE nodes SET sort_order = ?, updated_at = ? WHERE id = ?",
            params![position as i32, now, *id],
        )?;
    }
    Ok(())
}

/// Make a level sequential, keeping its current order
pub(super) fn reindex(conn: &Connection, parent_id: Option<NodeId>) -> DomainResult<()> {
    write_positions(conn, &child_ids(conn, parent_id)?)
}

#[async_trait]
impl NodePositioningOperations for super::node_repo::NodeRepository {
    async fn apply_order(&self, parent_id: Option<NodeId>, ordered_ids: &[NodeId]) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let current = child_ids(&conn, parent_id)?;

        let mut seen = Vec::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            if !current.contains(id) {
                return Err(DomainError::InvalidInput(format!(
                    "Node {} is not a child of {:?}",
                    id, parent_id
                )));
            }
            if seen.contains(id) {
                return Err(DomainError::InvalidInput(format!("Node {} listed twice", id)));
            }
            seen.push(*id);
        }
        let missing = current.iter().filter(|id| !seen.contains(id)).copied();
        let order: Vec<NodeId> = seen.iter().copied().chain(missing).collect();

        let tx = conn.transaction()?;
        write_positions(&tx, &order)?;
        tx.commit()?;
        Ok(())
    }
}
