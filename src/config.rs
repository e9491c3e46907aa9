use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// Frames rendered per internal sub-block
pub const DEFAULT_MAX_BLOCK: usize = 4096;

/// Engine settings, read from a JSON file. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub max_block: usize,
    /// Searched in order for relative sample filenames
    pub sample_dirs: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block: DEFAULT_MAX_BLOCK,
            sample_dirs: crate::samples::search_dirs(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Clamp values the engine cannot run with
    pub fn sanitized(mut self) -> Self {
        if self.sample_rate == 0 {
            self.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        self.max_block = self.max_block.max(1);
        self
    }
}
