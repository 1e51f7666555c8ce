//! SeriesLab Runner: orchestration of a retrieval run.
//!
//! This crate builds on `serieslab-core` to provide:
//! - TOML run configuration with defaults
//! - The series mapping reader
//! - The bounded-pool dispatcher with per-series fallback
//! - The end-to-end pipeline and its critical-error taxonomy
//! - Workbook output (CSV + Parquet per sheet), manifest and backup

pub mod backup;
pub mod config;
pub mod dispatcher;
pub mod manifest;
pub mod mapping;
pub mod pipeline;
pub mod workbook;

pub use backup::{backup_previous, BackupOutcome};
pub use config::{ConfigError, PipelineConfig};
pub use dispatcher::{
    BatchOutput, BatchPath, DispatchError, DispatchProgress, DispatchReport, DispatchSummary,
    Dispatcher, TracingProgress,
};
pub use manifest::{read_manifest, RunManifest, SheetEntry, MANIFEST_FILE};
pub use mapping::{load_mapping, read_mapping, MappingError, SeriesMapping};
pub use pipeline::{execute, retrieve, run, PipelineError, Retrieval, RunOutcome, RunPlan};
pub use workbook::{write_workbook, WorkbookOptions, WriteError, WrittenWorkbook};
