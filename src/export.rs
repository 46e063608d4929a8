use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::models::HistoryStore;

/// Serialize the full history to a portable JSON document named by calendar
/// day, e.g. `posture-data-2025-03-10.json`. Pure serialization of current
/// state; returns the written path.
pub fn write_export(history: &HistoryStore, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let file_name = format!("posture-data-{}.json", date.format("%Y-%m-%d"));
    let path = dir.join(file_name);

    let serialized = serde_json::to_string_pretty(history)
        .context("failed to serialize history for export")?;
    fs::write(&path, serialized)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    Ok(path)
}
