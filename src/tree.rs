//! Tree Utilities
//!
//! Builds the linked forest from a flat snapshot and provides the pure
//! mutators used for optimistic edits. Every mutator takes a `Forest` and
//! returns one; when nothing changes the very same `Arc` comes back, so
//! callers can detect a no-op with `Arc::ptr_eq`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;
use tree_dragdrop::TreeQuery;

use crate::models::{Node, NodeId, NodePatch, NodeRecord};

/// Ordered root nodes, each owning its subtree
pub type Forest = Arc<Vec<Node>>;

/// Result of indexing a snapshot
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    pub roots: Forest,
    /// Every distinct record as received
    pub lookup: HashMap<NodeId, NodeRecord>,
}

/// Link a flat list of records into a forest.
///
/// Records whose parent is missing, is a task, or sits on a parent cycle are
/// placed at the root instead of being dropped. Duplicate ids keep the first
/// occurrence. Siblings are ordered by `sort_order`, then id.
pub fn build_tree(records: &[NodeRecord]) -> TreeIndex {
    let mut lookup: HashMap<NodeId, NodeRecord> = HashMap::with_capacity(records.len());
    let mut unique: Vec<&NodeRecord> = Vec::with_capacity(records.len());
    for record in records {
        if lookup.contains_key(&record.id) {
            warn!(id = record.id, "duplicate node id in snapshot, keeping first");
            continue;
        }
        lookup.insert(record.id, record.clone());
        unique.push(record);
    }

    // Build parent -> children map
    let mut children_map: HashMap<Option<NodeId>, Vec<&NodeRecord>> = HashMap::new();
    for record in &unique {
        let parent = match record.parent_id {
            Some(pid) if pid != record.id && lookup.get(&pid).is_some_and(|p| !p.is_task) => Some(pid),
            Some(pid) => {
                warn!(id = record.id, parent_id = pid, "unusable parent, placing at root");
                None
            }
            None => None,
        };
        children_map.entry(parent).or_default().push(record);
    }
    for children in children_map.values_mut() {
        children.sort_by_key(|r| (r.sort_order, r.id));
    }

    fn link(
        record: &NodeRecord,
        parent_id: Option<NodeId>,
        children_map: &HashMap<Option<NodeId>, Vec<&NodeRecord>>,
        attached: &mut HashSet<NodeId>,
    ) -> Node {
        attached.insert(record.id);
        let mut node = Node::from_record(record);
        node.parent_id = parent_id;
        if let (Some(children), Some(kids)) = (node.children.as_mut(), children_map.get(&Some(record.id))) {
            for child in kids {
                if !attached.contains(&child.id) {
                    children.push(link(child, Some(record.id), children_map, attached));
                }
            }
        }
        node
    }

    let mut attached = HashSet::with_capacity(unique.len());
    let mut roots = Vec::new();
    if let Some(top) = children_map.get(&None) {
        for record in top {
            roots.push(link(record, None, &children_map, &mut attached));
        }
    }

    // Anything not reached sits on a parent cycle; break it at the first member
    let mut stranded: Vec<&NodeRecord> = unique.iter().copied().filter(|r| !attached.contains(&r.id)).collect();
    stranded.sort_by_key(|r| (r.sort_order, r.id));
    for record in stranded {
        if !attached.contains(&record.id) {
            warn!(id = record.id, "parent cycle in snapshot, placing at root");
            roots.push(link(record, None, &children_map, &mut attached));
        }
    }
    roots.sort_by_key(|n| (n.sort_order, n.id));

    TreeIndex {
        roots: Arc::new(roots),
        lookup,
    }
}

/// Depth-first search for a node
pub fn find_node_by_id(nodes: &[Node], id: NodeId) -> Option<&Node> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_by_id(node.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut(nodes: &mut [Node], id: NodeId) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_node_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Sibling list for a level: the roots for `None`, a project's children otherwise
fn level(nodes: &[Node], parent_id: Option<NodeId>) -> Option<&[Node]> {
    match parent_id {
        None => Some(nodes),
        Some(pid) => find_node_by_id(nodes, pid)?.children.as_deref(),
    }
}

fn level_mut(nodes: &mut Vec<Node>, parent_id: Option<NodeId>) -> Option<&mut Vec<Node>> {
    match parent_id {
        None => Some(nodes),
        Some(pid) => find_node_mut(nodes, pid)?.children.as_mut(),
    }
}

/// Detach a node (with its subtree) from wherever it sits
fn take_node(nodes: &mut Vec<Node>, id: NodeId) -> Option<Node> {
    if let Some(index) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(index));
    }
    for node in nodes.iter_mut() {
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = take_node(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn next_sort_order(siblings: &[Node]) -> i32 {
    siblings.iter().map(|n| n.sort_order).max().map_or(0, |max| max + 1)
}

/// `None` when the node is unknown, `Some(None)` for a root
pub fn parent_of(nodes: &[Node], id: NodeId) -> Option<Option<NodeId>> {
    find_node_by_id(nodes, id).map(|n| n.parent_id)
}

/// True iff `candidate_id` is a proper descendant of `ancestor_id`
pub fn is_descendant(nodes: &[Node], ancestor_id: NodeId, candidate_id: NodeId) -> bool {
    find_node_by_id(nodes, ancestor_id)
        .is_some_and(|ancestor| find_node_by_id(ancestor.children(), candidate_id).is_some())
}

/// Current sibling order at a level (root order for `None`)
pub fn get_child_order(nodes: &[Node], parent_id: Option<NodeId>) -> Vec<NodeId> {
    level(nodes, parent_id)
        .map(|siblings| siblings.iter().map(|n| n.id).collect())
        .unwrap_or_default()
}

/// The node and all of its descendants, pre-order
pub fn collect_subtree_ids(nodes: &[Node], id: NodeId) -> Vec<NodeId> {
    fn collect(node: &Node, out: &mut Vec<NodeId>) {
        out.push(node.id);
        for child in node.children() {
            collect(child, out);
        }
    }

    let mut ids = Vec::new();
    if let Some(node) = find_node_by_id(nodes, id) {
        collect(node, &mut ids);
    }
    ids
}

/// Move `active_id` to the index `over_id` currently occupies, both under
/// `parent_id`. Intervening siblings shift by one.
pub fn reorder_within_parent(
    forest: &Forest,
    parent_id: Option<NodeId>,
    active_id: NodeId,
    over_id: NodeId,
) -> Forest {
    let Some(siblings) = level(forest, parent_id) else {
        return Arc::clone(forest);
    };
    let from = siblings.iter().position(|n| n.id == active_id);
    let to = siblings.iter().position(|n| n.id == over_id);
    let (Some(from), Some(to)) = (from, to) else {
        return Arc::clone(forest);
    };
    if from == to {
        return Arc::clone(forest);
    }

    let mut roots = (**forest).clone();
    if let Some(siblings) = level_mut(&mut roots, parent_id) {
        let node = siblings.remove(from);
        siblings.insert(to, node);
        for (position, sibling) in siblings.iter_mut().enumerate() {
            sibling.sort_order = position as i32;
        }
    }
    Arc::new(roots)
}

/// Move a node with its whole subtree to the end of `new_parent_id`'s
/// children (or to the end of the roots for `None`).
///
/// Callers reject cyclic moves beforehand. A target that cannot take
/// children (unknown, a task, or inside the moved subtree) leaves the forest
/// untouched rather than dropping the node.
pub fn move_node_within_tree(forest: &Forest, node_id: NodeId, new_parent_id: Option<NodeId>) -> Forest {
    if find_node_by_id(forest, node_id).is_none() {
        return Arc::clone(forest);
    }

    let mut roots = (**forest).clone();
    let Some(mut node) = take_node(&mut roots, node_id) else {
        return Arc::clone(forest);
    };
    let Some(siblings) = level_mut(&mut roots, new_parent_id) else {
        return Arc::clone(forest);
    };
    node.parent_id = new_parent_id;
    node.sort_order = next_sort_order(siblings);
    siblings.push(node);
    Arc::new(roots)
}

/// Append a node at the end of a level. Existing ids and parents that cannot
/// take children are ignored.
pub fn insert_node(forest: &Forest, mut node: Node, parent_id: Option<NodeId>) -> Forest {
    if find_node_by_id(forest, node.id).is_some() {
        return Arc::clone(forest);
    }
    let mut roots = (**forest).clone();
    let Some(siblings) = level_mut(&mut roots, parent_id) else {
        return Arc::clone(forest);
    };
    node.parent_id = parent_id;
    node.sort_order = next_sort_order(siblings);
    if !node.is_task && node.children.is_none() {
        node.children = Some(Vec::new());
    }
    siblings.push(node);
    Arc::new(roots)
}

/// Remove a node together with its subtree
pub fn remove_node(forest: &Forest, id: NodeId) -> Forest {
    let mut roots = (**forest).clone();
    match take_node(&mut roots, id) {
        Some(_) => Arc::new(roots),
        None => Arc::clone(forest),
    }
}

/// Apply a field patch to one node
pub fn update_node(forest: &Forest, id: NodeId, patch: &NodePatch) -> Forest {
    if patch.is_empty() || find_node_by_id(forest, id).is_none() {
        return Arc::clone(forest);
    }
    let mut roots = (**forest).clone();
    if let Some(node) = find_node_mut(&mut roots, id) {
        patch.apply(node);
    }
    Arc::new(roots)
}

/// Render nodes as an indented list using recursive DFS.
/// Returns (node, depth) pairs in display order; children of collapsed
/// projects are skipped.
pub fn flatten_tree<'a>(nodes: &'a [Node], collapsed: &HashSet<NodeId>) -> Vec<(&'a Node, usize)> {
    fn collect<'a>(
        nodes: &'a [Node],
        depth: usize,
        collapsed: &HashSet<NodeId>,
        result: &mut Vec<(&'a Node, usize)>,
    ) {
        for node in nodes {
            result.push((node, depth));
            if !collapsed.contains(&node.id) {
                collect(node.children(), depth + 1, collapsed, result);
            }
        }
    }

    let mut result = Vec::new();
    collect(nodes, 0, collapsed, &mut result);
    result
}

/// Borrowed forest exposed to the drag/drop controller
#[derive(Clone, Copy)]
pub struct ForestView<'a>(pub &'a [Node]);

impl TreeQuery for ForestView<'_> {
    fn parent_of(&self, id: NodeId) -> Option<Option<NodeId>> {
        parent_of(self.0, id)
    }

    fn is_task(&self, id: NodeId) -> Option<bool> {
        find_node_by_id(self.0, id).map(|n| n.is_task)
    }

    fn is_descendant(&self, ancestor: NodeId, candidate: NodeId) -> bool {
        is_descendant(self.0, ancestor, candidate)
    }

    fn last_root(&self) -> Option<NodeId> {
        self.0.last().map(|n| n.id)
    }
}
