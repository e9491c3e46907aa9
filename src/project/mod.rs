//! State blob files on disk and offline rendering.

pub mod renderer;

use std::path::Path;

use anyhow::{Context, Result};

use crate::state::StateSummary;
use crate::synth::KitSynth;

/// Write the engine's state blob to a file
pub fn save_state(synth: &KitSynth, path: &Path) -> Result<()> {
    let blob = synth.serialize().context("Failed to serialize state")?;
    std::fs::write(path, blob).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Read a state blob and apply it to the engine. Sample loads are queued,
/// not awaited.
pub fn load_state(synth: &mut KitSynth, path: &Path) -> Result<()> {
    let blob = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    synth
        .deserialize(&blob)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(())
}

/// Decode a state blob file without an engine
pub fn inspect_state(path: &Path) -> Result<StateSummary> {
    let blob = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    StateSummary::decode(&blob).with_context(|| format!("Failed to parse {}", path.display()))
}
