use crate::undo::DEFAULT_HISTORY_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Policies of a [`GraphModel`](crate::GraphModel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Move edges into the nearest common ancestor of their terminals
    pub maintain_edge_parent: bool,

    /// Anchor the target end on its first non-relative ancestor as well
    pub ignore_relative_edge_parent: bool,

    /// Assign ids to cells inserted without one
    pub create_ids: bool,

    pub id_prefix: String,
    pub id_postfix: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            maintain_edge_parent: true,
            ignore_relative_edge_parent: true,
            create_ids: true,
            id_prefix: String::new(),
            id_postfix: String::new(),
        }
    }
}

/// Switches of a [`SwimlaneManager`](crate::SwimlaneManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwimlaneConfig {
    pub enabled: bool,

    /// Orientation assumed for cells that are not swimlanes
    pub horizontal: bool,

    pub add_enabled: bool,
    pub resize_enabled: bool,
}

impl Default for SwimlaneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            horizontal: true,
            add_enabled: true,
            resize_enabled: true,
        }
    }
}

/// Everything an editor session needs to set up its model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub model: ModelConfig,
    pub swimlane: SwimlaneConfig,
    pub undo_history_size: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            swimlane: SwimlaneConfig::default(),
            undo_history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl EditorConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse editor config")
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config from: {}", path.display()))
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create config file: {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write config to: {}", path.display()))?;
        Ok(())
    }
}
