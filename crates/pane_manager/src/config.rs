//! Manager configuration
//!
//! # Example Config File
//!
//! ```toml
//! animations_enabled = true
//! snapshot_format = "json"   # json, binary
//! max_pending_actions = 1024
//! dump_prefix = "  "
//! ```

use crate::snapshot::SnapshotFormat;
use pane_core::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`ComponentManager`](crate::ComponentManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Request transition animations when components enter or leave
    pub animations_enabled: bool,
    /// Encoding used by the byte-level save/restore entry points
    pub snapshot_format: SnapshotFormat,
    /// Maximum queued actions before enqueue is rejected
    pub max_pending_actions: usize,
    /// Indentation used by `dump`
    pub dump_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            snapshot_format: SnapshotFormat::Binary,
            max_pending_actions: 1024,
            dump_prefix: "  ".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Config for tests: no animations, human-readable snapshots
    pub fn testing() -> Self {
        Self {
            animations_enabled: false,
            snapshot_format: SnapshotFormat::Json,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ManagerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded manager config from {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_pending_actions == 0 {
            return Err(ManagerError::Config(
                "max_pending_actions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
