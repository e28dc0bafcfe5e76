//! Client Configuration
//!
//! JSON file with every field defaulted; a missing file means defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Quiet period before a burst of reorders is persisted
    pub debounce_ms: u64,
    /// Number of committed searches remembered
    pub recent_search_limit: usize,
    /// Notifications buffered per subscriber before the oldest are dropped
    pub notification_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 600,
            recent_search_limit: 10,
            notification_capacity: 64,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"debounce_ms": 250}"#).unwrap();
        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.recent_search_limit, 10);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(TrackerConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
