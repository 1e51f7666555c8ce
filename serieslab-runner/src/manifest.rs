//! Run manifest written next to the workbook sheets.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use serieslab_core::axis::Frequency;
use serieslab_core::distribute::SheetTable;

use crate::dispatcher::DispatchSummary;
use crate::workbook::WriteError;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub axis_points: usize,
    pub batch_size: usize,
    pub max_workers: usize,
    pub series_requested: usize,
    pub dispatch: DispatchSummary,
    pub merged_series: usize,
    pub duplicates_ignored: usize,
    pub invalid_labels: Vec<String>,
    pub sheets: Vec<SheetEntry>,
    pub skipped_sheets: Vec<String>,
    /// BLAKE3 over the consolidated table.
    pub dataset_hash: String,
}

impl RunManifest {
    /// Stamp the finish time and the wall-clock duration since `started_at`.
    pub fn mark_finished(&mut self) {
        self.finished_at = Utc::now();
        self.duration_secs = (self.finished_at - self.started_at)
            .to_std()
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub name: String,
    /// File name without extension.
    pub file_stem: String,
    pub columns: Vec<String>,
    pub filled_columns: usize,
}

impl SheetEntry {
    pub fn new(sheet: &SheetTable, file_stem: String) -> Self {
        Self {
            name: sheet.name.clone(),
            file_stem,
            columns: sheet.columns.iter().map(|c| c.label.clone()).collect(),
            filled_columns: sheet.filled_columns(),
        }
    }
}

pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<PathBuf, WriteError> {
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(&path, json).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

pub fn read_manifest(dir: &Path) -> Result<RunManifest, WriteError> {
    let path = dir.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&path).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
