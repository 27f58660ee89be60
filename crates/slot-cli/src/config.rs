use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slot_engine::BlockingStatuses;

/// Settings for the `slots` CLI, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Zone applied when a template record has none.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,

    /// Appointment statuses that occupy their slot.
    #[serde(default)]
    pub blocking_statuses: BlockingStatuses,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            blocking_statuses: BlockingStatuses::default(),
            pretty: false,
        }
    }
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

impl Config {
    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Default config file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "slots", "slots")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
