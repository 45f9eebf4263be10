//! Floorline configuration loaded from `floorline.toml`.
//!
//! [`FloorConfig`] holds every tunable. Values missing from the file use
//! sensible defaults, and `FLOORLINE_STATE_FILE` overrides the store path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::StaticCatalog;

pub const CONFIG_FILE: &str = "floorline.toml";
pub const STATE_FILE_ENV: &str = "FLOORLINE_STATE_FILE";

#[derive(Debug, Clone, Deserialize)]
pub struct FloorConfig {
    /// Simulator tick period in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// JSON file holding resources, jobs, and records.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Buffer size of the change-notice channel.
    #[serde(default = "default_notify_capacity")]
    pub notify_capacity: usize,

    /// Cycle time in seconds per product reference.
    #[serde(default)]
    pub products: HashMap<String, f64>,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_state_file() -> PathBuf {
    PathBuf::from("floorline.json")
}

fn default_notify_capacity() -> usize {
    64
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            state_file: default_state_file(),
            notify_capacity: default_notify_capacity(),
            products: HashMap::new(),
        }
    }
}

impl FloorConfig {
    /// Load `floorline.toml` from the working directory, or defaults if it
    /// does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<FloorConfig>(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(state_file) = std::env::var(STATE_FILE_ENV)
            && !state_file.is_empty()
        {
            config.state_file = PathBuf::from(state_file);
        }

        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn catalog(&self) -> StaticCatalog {
        StaticCatalog::new(self.products.clone())
    }
}
