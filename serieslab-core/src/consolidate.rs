//! Consolidation of per-series results into one axis-aligned table.
//!
//! Results are merged in the order given, which the runner fixes to batch
//! order, so the table does not depend on which worker finished first.
//! When the same series shows up twice, the first successful result wins.
//! A result without observations is not a success and never becomes a
//! column. Missing periods become `None` (no forward fill).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::axis::TimeAxis;
use crate::domain::{RawColumn, SeriesId, SeriesResult};

/// Wide table: one column per series, one row per axis point.
///
/// Every column has exactly `axis.len()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    axis: Arc<TimeAxis>,
    columns: BTreeMap<SeriesId, Vec<Option<f64>>>,
}

impl ConsolidatedTable {
    /// Table with no columns on the given axis.
    pub fn empty(axis: Arc<TimeAxis>) -> Self {
        Self {
            axis,
            columns: BTreeMap::new(),
        }
    }

    pub fn axis(&self) -> &Arc<TimeAxis> {
        &self.axis
    }

    pub fn column(&self, id: SeriesId) -> Option<&[Option<f64>]> {
        self.columns.get(&id).map(|v| v.as_slice())
    }

    pub fn contains(&self, id: SeriesId) -> bool {
        self.columns.contains_key(&id)
    }

    /// Series present in the table, ascending.
    pub fn ids(&self) -> impl Iterator<Item = SeriesId> + '_ {
        self.columns.keys().copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = (SeriesId, &[Option<f64>])> + '_ {
        self.columns.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Bookkeeping from one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Columns added to the table.
    pub merged: usize,
    /// Results dropped because their series was already merged.
    pub duplicates_ignored: usize,
    /// Labels that did not normalize to a valid series code.
    pub invalid_labels: Vec<String>,
    /// Observations dated off the axis (outside its range or between points).
    pub off_axis_points: usize,
    /// Repeated dates within one series; the first value was kept.
    pub repeated_dates: usize,
    /// Results carrying no observations; left out of the table.
    pub empty_results: usize,
}

/// Output of [`consolidate`].
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub table: ConsolidatedTable,
    pub report: ConsolidationReport,
}

/// Merge successful results into a [`ConsolidatedTable`] on `axis`.
pub fn consolidate<I>(results: I, axis: Arc<TimeAxis>) -> Consolidation
where
    I: IntoIterator<Item = SeriesResult>,
{
    let mut columns: BTreeMap<SeriesId, Vec<Option<f64>>> = BTreeMap::new();
    let mut report = ConsolidationReport::default();

    for result in results {
        let Some(id) = SeriesId::coerce(&result.label) else {
            tracing::warn!(
                label = %result.label,
                "column label is not a valid series code; dropped"
            );
            report.invalid_labels.push(result.label);
            continue;
        };
        if result.is_empty() {
            tracing::debug!(series = %id, "result has no observations; not merged");
            report.empty_results += 1;
            continue;
        }

        match columns.entry(id) {
            Entry::Occupied(_) => {
                tracing::debug!(series = %id, "duplicate result ignored (first successful wins)");
                report.duplicates_ignored += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(reindex(&result, &axis, &mut report));
                report.merged += 1;
            }
        }
    }

    Consolidation {
        table: ConsolidatedTable { axis, columns },
        report,
    }
}

/// Lay one raw series onto the axis.
fn reindex(
    column: &RawColumn,
    axis: &TimeAxis,
    report: &mut ConsolidationReport,
) -> Vec<Option<f64>> {
    let mut values = vec![None; axis.len()];
    let mut filled = vec![false; axis.len()];

    for obs in &column.observations {
        match axis.position(obs.date) {
            Some(pos) if filled[pos] => report.repeated_dates += 1,
            Some(pos) => {
                values[pos] = obs.value;
                filled[pos] = true;
            }
            None => report.off_axis_points += 1,
        }
    }

    values
}
