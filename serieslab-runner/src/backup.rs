//! Backup of the previous workbook before a run overwrites it.
//!
//! A failed backup is logged and reported, never fatal.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Nothing to back up yet.
    NoPreviousOutput,
    /// Previous workbook copied; number of files.
    Copied(usize),
    Failed(String),
}

/// Copy `source` recursively to `destination`, replacing an older backup.
pub fn backup_previous(source: &Path, destination: &Path) -> BackupOutcome {
    if !source.exists() {
        return BackupOutcome::NoPreviousOutput;
    }

    let result = (|| -> io::Result<usize> {
        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        copy_tree(source, destination)
    })();

    match result {
        Ok(files) => {
            tracing::info!(
                from = %source.display(),
                to = %destination.display(),
                files,
                "previous workbook backed up"
            );
            BackupOutcome::Copied(files)
        }
        Err(e) => {
            tracing::warn!(
                from = %source.display(),
                to = %destination.display(),
                error = %e,
                "backup failed; continuing without it"
            );
            BackupOutcome::Failed(e.to_string())
        }
    }
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<usize> {
    if from.is_file() {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to)?;
        return Ok(1);
    }

    fs::create_dir_all(to)?;
    let mut files = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        files += copy_tree(&entry.path(), &to.join(entry.file_name()))?;
    }
    Ok(files)
}
