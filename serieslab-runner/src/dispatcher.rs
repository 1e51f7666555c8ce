//! Concurrent fetch dispatcher.
//!
//! Runs one task per batch on a fixed-size rayon pool. Each task makes one
//! combined call; if that fails it resolves every series of the batch on
//! its own through the fallback tiers. A task that panics is isolated and
//! contributes nothing.
//!
//! Outputs come back over a channel in completion order and are sorted by
//! batch index before they leave this module.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use serieslab_core::data::{DataError, SeriesProvider};
use serieslab_core::domain::{FetchOutcome, OutcomeKind, SeriesId, SeriesResult};
use serieslab_core::partition::Batch;
use serieslab_core::resolve::{ResolveTier, Resolver, DEFAULT_TIERS};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// How a batch produced its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPath {
    /// The combined call succeeded.
    Combined,
    /// The combined call failed; series were resolved one by one.
    Fallback,
    /// The task panicked.
    Crashed,
}

/// Everything one batch task produced.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub batch: Batch,
    pub path: BatchPath,
    /// Successful results, in the order the task produced them.
    pub results: Vec<SeriesResult>,
    pub outcomes: Vec<(SeriesId, OutcomeKind)>,
}

impl BatchOutput {
    fn crashed(batch: Batch) -> Self {
        Self {
            batch,
            path: BatchPath::Crashed,
            results: Vec::new(),
            outcomes: Vec::new(),
        }
    }
}

/// Run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub batches: usize,
    pub combined_successes: usize,
    pub fallbacks: usize,
    pub worker_errors: usize,
    pub succeeded: usize,
    pub no_data_in_period: usize,
    pub permanently_failed: usize,
}

impl DispatchSummary {
    fn record(&mut self, output: &BatchOutput) {
        self.batches += 1;
        match output.path {
            BatchPath::Combined => self.combined_successes += 1,
            BatchPath::Fallback => self.fallbacks += 1,
            BatchPath::Crashed => self.worker_errors += 1,
        }
        for (_, kind) in &output.outcomes {
            match kind {
                OutcomeKind::Succeeded => self.succeeded += 1,
                OutcomeKind::NoDataInPeriod => self.no_data_in_period += 1,
                OutcomeKind::PermanentlyFailed => self.permanently_failed += 1,
            }
        }
    }
}

/// Batch outputs in batch-index order, plus counters.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outputs: Vec<BatchOutput>,
    pub summary: DispatchSummary,
}

impl DispatchReport {
    /// All successful results: batches by index, then task order.
    pub fn into_results(self) -> impl Iterator<Item = SeriesResult> {
        self.outputs.into_iter().flat_map(|o| o.results)
    }

    /// Terminal outcome of every series that went through the dispatcher.
    pub fn outcomes(&self) -> impl Iterator<Item = (SeriesId, OutcomeKind)> + '_ {
        self.outputs.iter().flat_map(|o| o.outcomes.iter().copied())
    }
}

/// Callbacks for dispatch progress. Called from worker threads.
pub trait DispatchProgress: Send + Sync {
    /// A batch task started.
    fn on_batch_start(&self, batch: &Batch, total: usize);

    /// The combined call of a batch failed; fallback follows.
    fn on_batch_fallback(&self, batch: &Batch, error: &DataError);

    /// One series reached its terminal state through fallback.
    fn on_series_outcome(&self, id: SeriesId, outcome: &FetchOutcome);

    /// All batches have reported.
    fn on_complete(&self, summary: &DispatchSummary);
}

/// Progress reporter that narrates through `tracing`.
pub struct TracingProgress;

impl DispatchProgress for TracingProgress {
    fn on_batch_start(&self, batch: &Batch, total: usize) {
        let head = batch.head().map(|id| id.to_string()).unwrap_or_default();
        tracing::info!(
            batch = batch.index + 1,
            total,
            size = batch.len(),
            "starting batch {}/{total} beginning at series {head}",
            batch.index + 1
        );
    }

    fn on_batch_fallback(&self, batch: &Batch, error: &DataError) {
        tracing::warn!(
            batch = batch.index + 1,
            %error,
            "combined fetch failed; resolving {} series individually",
            batch.len()
        );
    }

    fn on_series_outcome(&self, id: SeriesId, outcome: &FetchOutcome) {
        if let FetchOutcome::Succeeded(result) = outcome {
            tracing::debug!(series = %id, points = result.observations.len(), "series recovered");
        }
    }

    fn on_complete(&self, summary: &DispatchSummary) {
        tracing::info!(
            batches = summary.batches,
            fallbacks = summary.fallbacks,
            worker_errors = summary.worker_errors,
            succeeded = summary.succeeded,
            no_data = summary.no_data_in_period,
            failed = summary.permanently_failed,
            "dispatch complete"
        );
    }
}

/// Runs batches against one shared provider on a bounded pool.
pub struct Dispatcher<'a> {
    provider: &'a dyn SeriesProvider,
    start: NaiveDate,
    max_workers: usize,
    tiers: &'a [ResolveTier],
    progress: &'a dyn DispatchProgress,
}

impl<'a> Dispatcher<'a> {
    pub fn new(provider: &'a dyn SeriesProvider, start: NaiveDate, max_workers: usize) -> Self {
        Self {
            provider,
            start,
            max_workers: max_workers.max(1),
            tiers: &DEFAULT_TIERS,
            progress: &TracingProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn DispatchProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_tiers(mut self, tiers: &'a [ResolveTier]) -> Self {
        self.tiers = tiers;
        self
    }

    /// Execute every batch and wait for all of them.
    pub fn dispatch(&self, batches: Vec<Batch>) -> Result<DispatchReport, DispatchError> {
        let total = batches.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|i| format!("serieslab-worker-{i}"))
            .build()?;

        let mut outputs = Vec::with_capacity(total);
        pool.in_place_scope(|scope| {
            let (tx, rx) = mpsc::channel::<BatchOutput>();
            for batch in batches {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let task = catch_unwind(AssertUnwindSafe(|| self.run_batch(&batch, total)));
                    let output = task.unwrap_or_else(|payload| {
                        tracing::error!(
                            batch = batch.index + 1,
                            panic = %panic_message(payload.as_ref()),
                            "CRITICAL worker error; batch contributes no results"
                        );
                        BatchOutput::crashed(batch)
                    });
                    // The receiver outlives every task.
                    let _ = tx.send(output);
                });
            }
            drop(tx);
            outputs.extend(rx);
        });

        outputs.sort_by_key(|o: &BatchOutput| o.batch.index);
        let mut summary = DispatchSummary::default();
        for output in &outputs {
            summary.record(output);
        }
        self.progress.on_complete(&summary);

        Ok(DispatchReport { outputs, summary })
    }

    fn run_batch(&self, batch: &Batch, total: usize) -> BatchOutput {
        self.progress.on_batch_start(batch, total);

        match self.provider.fetch(&batch.ids, Some(self.start)) {
            Ok(frame) => {
                let mut results = Vec::with_capacity(frame.columns.len());
                let mut outcomes = Vec::with_capacity(frame.columns.len());
                for column in frame.columns {
                    match SeriesId::coerce(&column.label) {
                        Some(id) if column.is_empty() => {
                            tracing::warn!(series = %id, "data retrieved but none within period");
                            self.progress.on_series_outcome(id, &FetchOutcome::NoDataInPeriod);
                            outcomes.push((id, OutcomeKind::NoDataInPeriod));
                        }
                        Some(id) => {
                            outcomes.push((id, OutcomeKind::Succeeded));
                            results.push(column);
                        }
                        // Left for consolidation to count as an invalid label.
                        None => results.push(column),
                    }
                }
                BatchOutput {
                    batch: batch.clone(),
                    path: BatchPath::Combined,
                    results,
                    outcomes,
                }
            }
            Err(error) => {
                self.progress.on_batch_fallback(batch, &error);
                let resolver = Resolver::new(self.provider, self.start).with_tiers(self.tiers);

                let mut results = Vec::new();
                let mut outcomes = Vec::with_capacity(batch.len());
                for &id in &batch.ids {
                    let outcome = resolver.resolve(id);
                    self.progress.on_series_outcome(id, &outcome);
                    outcomes.push((id, outcome.kind()));
                    if let Some(result) = outcome.into_result() {
                        results.push(result);
                    }
                }
                BatchOutput {
                    batch: batch.clone(),
                    path: BatchPath::Fallback,
                    results,
                    outcomes,
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
