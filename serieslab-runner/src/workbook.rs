//! Workbook output: one CSV (and optionally one Parquet file) per sheet,
//! plus the run manifest, in a single directory.
//!
//! Everything is written to a sibling temporary directory first and moved
//! into place only once every file is complete.

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::{Column, DataFrame, NamedFrom, ParquetWriter, Series};
use thiserror::Error;

use serieslab_core::distribute::SheetTable;

use crate::manifest::{write_manifest, RunManifest, SheetEntry};

/// Header of the date column in every sheet.
pub const DATE_HEADER: &str = "Data";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write failed for {path}: {message}")]
    Parquet { path: PathBuf, message: String },

    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkbookOptions {
    pub parquet: bool,
}

impl Default for WorkbookOptions {
    fn default() -> Self {
        Self { parquet: true }
    }
}

/// What ended up on disk.
#[derive(Debug, Clone)]
pub struct WrittenWorkbook {
    pub directory: PathBuf,
    pub manifest: RunManifest,
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}

/// File stems for `names`, unique ignoring case.
pub fn file_stems<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: Vec<String> = Vec::new();
    let mut stems = Vec::new();

    for name in names {
        let base = sanitize_sheet_name(name);
        let mut stem = base.clone();
        let mut n = 2;
        while taken.contains(&stem.to_lowercase()) {
            stem = format!("{base}_{n}");
            n += 1;
        }
        taken.push(stem.to_lowercase());
        stems.push(stem);
    }
    stems
}

/// Write every sheet and the manifest into `dir`, replacing what was there.
///
/// `manifest.sheets` is filled in here from the sheets actually written, and
/// the finish time is stamped just before the manifest itself is written.
pub fn write_workbook(
    dir: &Path,
    sheets: &[SheetTable],
    options: WorkbookOptions,
    mut manifest: RunManifest,
) -> Result<WrittenWorkbook, WriteError> {
    let staging = sibling(dir, "tmp");
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(io_error(&staging))?;
    }
    fs::create_dir_all(&staging).map_err(io_error(&staging))?;

    let staged = stage_sheets(&staging, sheets, options, &mut manifest);
    if let Err(e) = staged.and_then(|()| swap_into_place(&staging, dir)) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    tracing::info!(dir = %dir.display(), sheets = manifest.sheets.len(), "workbook written");
    Ok(WrittenWorkbook {
        directory: dir.to_path_buf(),
        manifest,
    })
}

fn stage_sheets(
    staging: &Path,
    sheets: &[SheetTable],
    options: WorkbookOptions,
    manifest: &mut RunManifest,
) -> Result<(), WriteError> {
    let stems = file_stems(sheets.iter().map(|s| s.name.as_str()));
    manifest.sheets.clear();
    for (sheet, stem) in sheets.iter().zip(stems) {
        write_sheet_csv(&staging.join(format!("{stem}.csv")), sheet)?;
        if options.parquet {
            write_sheet_parquet(&staging.join(format!("{stem}.parquet")), sheet)?;
        }
        tracing::debug!(sheet = %sheet.name, file = %stem, "sheet written");
        manifest.sheets.push(SheetEntry::new(sheet, stem));
    }
    manifest.mark_finished();
    write_manifest(staging, manifest)?;
    Ok(())
}

/// `.<name>.<suffix>` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    dir.with_file_name(format!(".{name}.{suffix}"))
}

fn swap_into_place(staging: &Path, dir: &Path) -> Result<(), WriteError> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    if !dir.exists() {
        return fs::rename(staging, dir).map_err(io_error(dir));
    }

    let retired = sibling(dir, "old");
    if retired.exists() {
        fs::remove_dir_all(&retired).map_err(io_error(&retired))?;
    }
    fs::rename(dir, &retired).map_err(io_error(dir))?;
    if let Err(source) = fs::rename(staging, dir) {
        // Put the previous workbook back.
        let _ = fs::rename(&retired, dir);
        return Err(WriteError::Io {
            path: dir.to_path_buf(),
            source,
        });
    }
    if let Err(e) = fs::remove_dir_all(&retired) {
        tracing::warn!(path = %retired.display(), error = %e, "could not remove previous workbook");
    }
    Ok(())
}

fn write_sheet_csv(path: &Path, sheet: &SheetTable) -> Result<(), WriteError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(sheet.columns.len() + 1);
    header.push(DATE_HEADER.to_string());
    header.extend(sheet.columns.iter().map(|c| c.label.clone()));
    writer.write_record(&header)?;

    for (row, date) in sheet.axis.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        for column in &sheet.columns {
            record.push(column.values[row].map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush().map_err(io_error(path))?;
    Ok(())
}

fn write_sheet_parquet(path: &Path, sheet: &SheetTable) -> Result<(), WriteError> {
    let parquet_error = |message: String| WriteError::Parquet {
        path: path.to_path_buf(),
        message,
    };

    let dates: Vec<String> = sheet
        .axis
        .dates()
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();

    let mut columns = Vec::with_capacity(sheet.columns.len() + 1);
    columns.push(Column::Series(Series::new(DATE_HEADER.into(), dates).into()));
    for column in &sheet.columns {
        columns.push(Column::Series(Series::new(
            column.label.as_str().into(),
            column.values.clone(),
        ).into()));
    }

    let mut df = DataFrame::new(columns).map_err(|e| parquet_error(format!("dataframe: {e}")))?;
    let mut file = fs::File::create(path).map_err(io_error(path))?;
    ParquetWriter::new(&mut file)
        .finish(&mut df)
        .map_err(|e| parquet_error(format!("write: {e}")))?;
    Ok(())
}
