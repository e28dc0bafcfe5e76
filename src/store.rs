//! Recent Searches Store
//!
//! Explicit handle over the committed search history: hydrated from a JSON
//! file on startup, appended on commit, written back after every change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access search history: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt search history: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSearches {
    searches: Vec<String>,
}

/// Most recent first, capped at `limit`
#[derive(Debug, Clone)]
pub struct RecentSearches {
    path: Option<PathBuf>,
    limit: usize,
    entries: Vec<String>,
}

impl RecentSearches {
    /// History that is never written to disk
    pub fn in_memory(limit: usize) -> Self {
        Self {
            path: None,
            limit,
            entries: Vec::new(),
        }
    }

    /// Load history from `path`; a missing file starts empty
    pub fn hydrate(path: impl Into<PathBuf>, limit: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let mut entries = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str::<StoredSearches>(&text)?.searches
        } else {
            Vec::new()
        };
        entries.truncate(limit);
        debug!(count = entries.len(), path = %path.display(), "search history loaded");
        Ok(Self {
            path: Some(path),
            limit,
            entries,
        })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a committed query. Blank queries are ignored; repeating a query
    /// moves it to the front.
    pub fn commit(&mut self, query: &str) -> Result<(), StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.entries.retain(|e| !e.eq_ignore_ascii_case(query));
        self.entries.insert(0, query.to_string());
        self.entries.truncate(self.limit);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let stored = StoredSearches {
            searches: self.entries.clone(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }
}
