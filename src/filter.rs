//! Search and Filter
//!
//! Narrows the forest for display. A matching node is kept together with its
//! ancestors so it stays in context; the ancestors themselves are not
//! required to match.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::{Node, Status};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    /// Case-insensitive substring over name, meta description and notes
    pub query: String,
    /// Empty means any status
    pub statuses: HashSet<Status>,
    pub include_archived: bool,
    /// Keep only nodes due on or before this date
    pub deadline_before: Option<NaiveDate>,
}

impl FilterOptions {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Nothing to narrow beyond hiding archived nodes
    pub fn is_passthrough(&self) -> bool {
        self.query.trim().is_empty() && self.statuses.is_empty() && self.deadline_before.is_none()
    }

    fn matches(&self, node: &Node, needle: &str) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&node.status) {
            return false;
        }
        if let Some(cutoff) = self.deadline_before {
            match node.deadline {
                Some(deadline) if deadline <= cutoff => {}
                _ => return false,
            }
        }
        if needle.is_empty() {
            return true;
        }
        let hit = |text: Option<&str>| text.is_some_and(|t| t.to_lowercase().contains(needle));
        hit(Some(node.name.as_str())) || hit(node.meta_description.as_deref()) || hit(node.notes.as_deref())
    }
}

/// Filtered copy of the forest, keeping sibling order
pub fn filter_forest(nodes: &[Node], options: &FilterOptions) -> Vec<Node> {
    let needle = options.query.trim().to_lowercase();
    let passthrough = options.is_passthrough();

    fn visit(node: &Node, options: &FilterOptions, needle: &str, passthrough: bool) -> Option<Node> {
        if node.status == Status::Archived && !options.include_archived {
            return None;
        }
        let kept: Option<Vec<Node>> = node.children.as_ref().map(|children| {
            children
                .iter()
                .filter_map(|c| visit(c, options, needle, passthrough))
                .collect()
        });
        let has_kept_children = kept.as_ref().is_some_and(|k| !k.is_empty());
        if passthrough || has_kept_children || options.matches(node, needle) {
            let mut copy = node.clone();
            copy.children = kept;
            Some(copy)
        } else {
            None
        }
    }

    nodes
        .iter()
        .filter_map(|n| visit(n, options, &needle, passthrough))
        .collect()
}
