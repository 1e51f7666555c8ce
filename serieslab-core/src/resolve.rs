//! Tiered fallback resolution of a single series.
//!
//! When a combined batch call fails, each of its series is resolved on its
//! own by walking an ordered list of tiers:
//! 1. strict windowed fetch from the start date
//! 2. full-history fetch, filtered locally to the start date
//! 3. permanent failure when every tier errored
//!
//! The resolver always returns a [`FetchOutcome`]; provider errors never
//! escape it.

use chrono::NaiveDate;

use crate::data::{DataError, SeriesProvider};
use crate::domain::{FetchOutcome, RawColumn, SeriesFrame, SeriesId};

/// One fetch strategy in the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveTier {
    /// Request the series starting at the run's start date.
    StrictWindow,
    /// Request the whole history and discard points before the start date.
    FullHistoryFiltered,
}

/// The order tiers are tried in.
pub const DEFAULT_TIERS: [ResolveTier; 2] =
    [ResolveTier::StrictWindow, ResolveTier::FullHistoryFiltered];

impl ResolveTier {
    pub fn name(self) -> &'static str {
        match self {
            ResolveTier::StrictWindow => "strict_window",
            ResolveTier::FullHistoryFiltered => "full_history_filtered",
        }
    }

    /// Run this tier. `Err` means "try the next tier".
    fn attempt(
        self,
        provider: &dyn SeriesProvider,
        id: SeriesId,
        start: NaiveDate,
    ) -> Result<FetchOutcome, DataError> {
        match self {
            ResolveTier::StrictWindow => {
                let column = single_column(provider.fetch(&[id], Some(start))?, id);
                if column.is_empty() {
                    Ok(FetchOutcome::NoDataInPeriod)
                } else {
                    Ok(FetchOutcome::Succeeded(column))
                }
            }
            ResolveTier::FullHistoryFiltered => {
                let frame = provider.fetch(&[id], None)?;
                let mut column = single_column(frame, id);
                column.retain_from(start);
                if column.is_empty() {
                    Ok(FetchOutcome::NoDataInPeriod)
                } else {
                    Ok(FetchOutcome::Succeeded(column))
                }
            }
        }
    }
}

/// Pull the one column a single-series request produced, labelled with `id`.
///
/// A frame without a column carrying the id's label falls back to its first
/// column; a frame without any column is an empty series.
fn single_column(mut frame: SeriesFrame, id: SeriesId) -> RawColumn {
    let label = id.to_string();
    let observations = match frame.take_column(&label) {
        Some(column) => column.observations,
        None if !frame.columns.is_empty() => frame.columns.swap_remove(0).observations,
        None => Vec::new(),
    };
    RawColumn::new(label, observations)
}

/// Resolves individual series through the fallback tiers.
pub struct Resolver<'a> {
    provider: &'a dyn SeriesProvider,
    start: NaiveDate,
    tiers: &'a [ResolveTier],
}

impl<'a> Resolver<'a> {
    pub fn new(provider: &'a dyn SeriesProvider, start: NaiveDate) -> Self {
        Self {
            provider,
            start,
            tiers: &DEFAULT_TIERS,
        }
    }

    /// Use a custom tier order.
    pub fn with_tiers(mut self, tiers: &'a [ResolveTier]) -> Self {
        self.tiers = tiers;
        self
    }

    /// Resolve one series to its terminal outcome.
    pub fn resolve(&self, id: SeriesId) -> FetchOutcome {
        let mut last_error: Option<DataError> = None;

        for &tier in self.tiers {
            match tier.attempt(self.provider, id, self.start) {
                Ok(FetchOutcome::NoDataInPeriod) => {
                    tracing::warn!(
                        series = %id,
                        tier = tier.name(),
                        "series {id}: data retrieved but none within period"
                    );
                    return FetchOutcome::NoDataInPeriod;
                }
                Ok(outcome) => {
                    tracing::debug!(series = %id, tier = tier.name(), "series resolved");
                    return outcome;
                }
                Err(e) => {
                    tracing::debug!(series = %id, tier = tier.name(), error = %e, "tier failed");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no fallback tiers configured".to_string());
        tracing::error!(series = %id, %reason, "series {id} failed permanently");
        FetchOutcome::PermanentlyFailed { reason }
    }
}
