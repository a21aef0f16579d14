//! JSON snapshot files.
//!
//! A snapshot file holds exactly one [`RateSnapshot`] so a scan can be
//! replayed offline against the same rates. Files are overwritten, never
//! appended to; there is no history.

use std::path::Path;

use eyre::{Context, Result};
use tracing::info;

use crate::types::RateSnapshot;

/// Reads a snapshot from a JSON file.
///
/// # Errors
///
/// Returns error if the file cannot be read or does not contain a snapshot.
pub fn load_snapshot(path: &Path) -> Result<RateSnapshot> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot: RateSnapshot = serde_json::from_str(&content)
        .wrap_err_with(|| format!("failed to parse snapshot {}", path.display()))?;

    info!(
        path = %path.display(),
        instruments = snapshot.instruments.len(),
        quotes = snapshot.quote_count(),
        "loaded rate snapshot"
    );
    Ok(snapshot)
}

/// Writes a snapshot as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns error if the directory or file cannot be written.
pub fn save_snapshot(snapshot: &RateSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(snapshot).wrap_err("failed to serialize snapshot")?;
    std::fs::write(path, json)
        .wrap_err_with(|| format!("failed to write snapshot {}", path.display()))?;

    info!(path = %path.display(), quotes = snapshot.quote_count(), "saved rate snapshot");
    Ok(())
}
