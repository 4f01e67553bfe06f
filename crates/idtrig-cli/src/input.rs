//! Loading trigger definitions and identity snapshots from disk.

use std::path::Path;

use anyhow::{Context, Result};
use idtrig_core::IdentitySnapshot;
use idtrig_engine::TriggerDefinition;

/// Read a YAML list of trigger definitions. Definitions are parsed but not
/// validated.
pub fn load_triggers(path: &Path) -> Result<Vec<TriggerDefinition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read triggers {}", path.display()))?;
    let definitions: Vec<TriggerDefinition> = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse triggers {}", path.display()))?;
    tracing::info!(count = definitions.len(), path = %path.display(), "loaded trigger definitions");
    Ok(definitions)
}

/// Read a JSON identity snapshot.
pub fn load_snapshot(path: &Path) -> Result<IdentitySnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    IdentitySnapshot::from_json(&content)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))
}

/// Read an optional snapshot.
pub fn load_optional_snapshot(path: Option<&Path>) -> Result<Option<IdentitySnapshot>> {
    path.map(load_snapshot).transpose()
}
