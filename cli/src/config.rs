//! Node configuration file (`cadence.toml`)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "$HOME/.cadence/cadence.toml";
pub const DEFAULT_DATA_DIR: &str = "$HOME/.cadence/data";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub data_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Flag value first, then the config file, then the built-in default
    pub fn data_dir(&self, flag: Option<&Path>) -> PathBuf {
        match flag {
            Some(dir) => dir.to_path_buf(),
            None => expand_path(self.node.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR)),
        }
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(path.replace("$HOME", &std::env::var("HOME").unwrap_or_default()))
}

pub fn load_config(path: &Path) -> Result<NodeConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

/// An explicit `--config` must exist; the default location is optional
pub fn resolve_config(explicit: Option<&Path>) -> Result<NodeConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default = expand_path(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(&default)
            } else {
                Ok(NodeConfig::default())
            }
        }
    }
}
