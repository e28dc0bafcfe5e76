//! Node Repository - Core CRUD Operations
//!
//! SQLite-backed implementation. Hierarchy and ordering live in
//! `node_hierarchy` and `node_positioning`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use project_tree::{NodeId, Status};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::node_positioning::next_position;
use crate::domain::{DomainError, DomainResult, StoredNode};
use crate::repository::traits::Repository;

pub(super) const NODE_COLUMNS: &str =
    "id, name, is_task, status, parent_id, sort_order, deadline, meta_description, notes, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite implementation of the node repository
#[derive(Clone)]
pub struct NodeRepository {
    pub(super) conn: Arc<Mutex<Connection>>,
}

impl NodeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

pub(super) fn find_in(conn: &Connection, id: NodeId) -> DomainResult<Option<StoredNode>> {
    let node = conn
        .query_row(
            &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
            params![id],
            row_to_node,
        )
        .optional()?;
    Ok(node)
}

pub(super) fn require(conn: &Connection, id: NodeId) -> DomainResult<StoredNode> {
    find_in(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("Node {} not found", id)))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl Repository<StoredNode> for NodeRepository {
    async fn create(&self, entity: &StoredNode) -> DomainResult<StoredNode> {
        if entity.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Name must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        if let Some(pid) = entity.parent_id {
            if require(&conn, pid)?.is_task {
                return Err(DomainError::InvalidInput(format!("Task {} cannot have children", pid)));
            }
        }

        let position = next_position(&conn, entity.parent_id)?;
        let now = now_millis();
        conn.execute(
            "INSERT INTO nodes (name, is_task, status, parent_id, sort_order, deadline, meta_description, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entity.name.trim(),
                entity.is_task,
                entity.status.as_str(),
                entity.parent_id,
                position,
                entity.deadline.map(|d| d.format(DATE_FORMAT).to_string()),
                entity.meta_description,
                entity.notes,
                now,
                now
            ],
        )?;

        let mut node = entity.clone();
        node.id = NodeId::try_from(conn.last_insert_rowid())
            .map_err(|e| DomainError::Internal(format!("Node id out of range: {}", e)))?;
        node.name = entity.name.trim().to_string();
        node.sort_order = position;
        node.created_at = Some(now);
        node.updated_at = Some(now);
        Ok(node)
    }

    async fn find_by_id(&self, id: NodeId) -> DomainResult<Option<StoredNode>> {
        let conn = self.conn.lock().await;
        find_in(&conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<StoredNode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM nodes ORDER BY parent_id NULLS FIRST, sort_order ASC, id ASC",
            NODE_COLUMNS
        ))?;
        let nodes = stmt
            .query_map([], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    /// Descriptive fields only; parent and position change through
    /// hierarchy and positioning operations.
    async fn update(&self, entity: &StoredNode) -> DomainResult<StoredNode> {
        if entity.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Name must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        let now = now_millis();
        let changed = conn.execute(
            "UPDATE nodes SET name = ?, status = ?, deadline = ?, meta_description = ?, notes = ?, updated_at = ? WHERE id = ?",
            params![
                entity.name.trim(),
                entity.status.as_str(),
                entity.deadline.map(|d| d.format(DATE_FORMAT).to_string()),
                entity.meta_description,
                entity.notes,
                now,
                entity.id
            ],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Node {} not found", entity.id)));
        }
        require(&conn, entity.id)
    }

    async fn delete(&self, id: NodeId) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let parent_id = require(&conn, id)?.parent_id;

        // Manual cascade over all descendants
        conn.execute(
            "DELETE FROM nodes WHERE id IN (
                WITH RECURSIVE descendants AS (
                    SELECT id FROM nodes WHERE parent_id = ?
                    UNION ALL
                    SELECT n.id FROM nodes n
                    JOIN descendants d ON n.parent_id = d.id
                )
                SELECT id FROM descendants
            )",
            params![id],
        )?;
        conn.execute("DELETE FROM nodes WHERE id = ?", params![id])?;

        super::node_positioning::reindex(&conn, parent_id)?;
        Ok(())
    }
}

/// Convert a database row to a node
pub(super) fn row_to_node(row: &Row<'_>) -> rusqlite::Result<StoredNode> {
    let deadline: Option<String> = row.get(6)?;
    Ok(StoredNode {
        id: row.get(0)?,
        name: row.get(1)?,
        is_task: row.get(2)?,
        status: Status::from_str(&row.get::<_, String>(3)?),
        parent_id: row.get(4)?,
        sort_order: row.get(5)?,
        deadline: deadline.and_then(|d| NaiveDate::parse_from_str(&d, DATE_FORMAT).ok()),
        meta_description: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
