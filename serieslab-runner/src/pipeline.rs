//! The end-to-end run: plan, dispatch, consolidate, distribute, write.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use serieslab_core::axis::TimeAxis;
use serieslab_core::consolidate::{consolidate, ConsolidatedTable, ConsolidationReport};
use serieslab_core::data::SeriesProvider;
use serieslab_core::distribute::{distribute, Distribution};
use serieslab_core::fingerprint::dataset_hash;
use serieslab_core::partition::{partition, Batch};

use crate::backup::{backup_previous, BackupOutcome};
use crate::config::{ConfigError, PipelineConfig};
use crate::dispatcher::{DispatchError, DispatchProgress, DispatchSummary, Dispatcher};
use crate::manifest::RunManifest;
use crate::mapping::{load_mapping, MappingError, SeriesMapping};
use crate::workbook::{write_workbook, WorkbookOptions, WriteError, WrittenWorkbook};

/// Critical failures. Anything else is absorbed and reported.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("no valid series identifiers in {}", .0.display())]
    NoValidIdentifiers(PathBuf),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("no output produced: every sheet was empty or skipped")]
    NoOutput,

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl PipelineError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Everything decided before any network traffic.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub axis: Arc<TimeAxis>,
    pub mapping: SeriesMapping,
    pub batches: Vec<Batch>,
}

impl RunPlan {
    /// Build the axis and batches for `mapping`.
    pub fn new(
        config: &PipelineConfig,
        mapping: SeriesMapping,
        today: NaiveDate,
    ) -> Result<Self, PipelineError> {
        if mapping.is_empty() {
            return Err(PipelineError::NoValidIdentifiers(config.input.series.clone()));
        }

        let start = config.run.start_date;
        let end = config.end_date_or(today);
        let axis = Arc::new(TimeAxis::build(start, end, config.run.frequency));
        if axis.is_empty() {
            tracing::warn!(%start, %end, "time axis is empty; sheets will have no rows");
        }
        let batches = partition(&mapping.ids(), config.run.batch_size);

        Ok(Self {
            start,
            end,
            axis,
            mapping,
            batches,
        })
    }

    /// Read the mapping file named in `config` and plan the run.
    pub fn load(config: &PipelineConfig, today: NaiveDate) -> Result<Self, PipelineError> {
        let mapping = load_mapping(&config.input.series)?;
        tracing::info!(
            rows = mapping.rows.len(),
            dropped = mapping.dropped,
            file = %config.input.series.display(),
            "series mapping loaded"
        );
        Self::new(config, mapping, today)
    }

    /// Distinct series that will be requested.
    pub fn series_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// In-memory result of fetching and reshaping.
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub table: ConsolidatedTable,
    pub consolidation: ConsolidationReport,
    pub distribution: Distribution,
    pub summary: DispatchSummary,
}

/// Fetch every planned series and lay the results out on sheets.
pub fn retrieve(
    config: &PipelineConfig,
    plan: &RunPlan,
    provider: &dyn SeriesProvider,
    progress: &dyn DispatchProgress,
) -> Result<Retrieval, PipelineError> {
    tracing::info!(
        provider = provider.name(),
        series = plan.series_count(),
        batches = plan.batches.len(),
        workers = config.run.max_workers,
        "dispatching"
    );
    let report = Dispatcher::new(provider, plan.start, config.run.max_workers)
        .with_progress(progress)
        .dispatch(plan.batches.clone())?;
    let summary = report.summary;

    let merged = consolidate(report.into_results(), Arc::clone(&plan.axis));
    tracing::info!(
        columns = merged.table.width(),
        rows = plan.axis.len(),
        "consolidated"
    );

    let distribution = distribute(&merged.table, &plan.mapping.rows);

    Ok(Retrieval {
        table: merged.table,
        consolidation: merged.report,
        distribution,
        summary,
    })
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub workbook: WrittenWorkbook,
    pub backup: Option<BackupOutcome>,
    pub summary: DispatchSummary,
}

/// Run a planned pipeline to completion, writing the workbook.
pub fn execute(
    config: &PipelineConfig,
    plan: RunPlan,
    provider: &dyn SeriesProvider,
    progress: &dyn DispatchProgress,
) -> Result<RunOutcome, PipelineError> {
    let started_at = Utc::now();

    let retrieval = retrieve(config, &plan, provider, progress)?;
    if retrieval.distribution.sheets.is_empty() {
        return Err(PipelineError::NoOutput);
    }

    let backup = config
        .output
        .backup
        .as_deref()
        .map(|dest| backup_previous(&config.output.directory, dest));

    let manifest = RunManifest {
        started_at,
        // Stamped by the writer once every sheet is on disk.
        finished_at: started_at,
        duration_secs: 0.0,
        start_date: plan.start,
        end_date: plan.end,
        frequency: plan.axis.frequency(),
        axis_points: plan.axis.len(),
        batch_size: config.run.batch_size,
        max_workers: config.run.max_workers,
        series_requested: plan.series_count(),
        dispatch: retrieval.summary,
        merged_series: retrieval.consolidation.merged,
        duplicates_ignored: retrieval.consolidation.duplicates_ignored,
        invalid_labels: retrieval.consolidation.invalid_labels.clone(),
        sheets: Vec::new(),
        skipped_sheets: retrieval
            .distribution
            .skipped
            .iter()
            .map(|s| s.name.clone())
            .collect(),
        dataset_hash: dataset_hash(&retrieval.table).to_string(),
    };

    let options = WorkbookOptions {
        parquet: config.output.parquet,
    };
    let workbook = write_workbook(
        &config.output.directory,
        &retrieval.distribution.sheets,
        options,
        manifest,
    )?;

    Ok(RunOutcome {
        workbook,
        backup,
        summary: retrieval.summary,
    })
}

/// Load the mapping, plan, and execute.
pub fn run(
    config: &PipelineConfig,
    provider: &dyn SeriesProvider,
    progress: &dyn DispatchProgress,
    today: NaiveDate,
) -> Result<RunOutcome, PipelineError> {
    let plan = RunPlan::load(config, today)?;
    execute(config, plan, provider, progress)
}
