//! Observations and the tabular shapes providers hand back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One `(date, value)` point of a series. Missing values stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// One labelled column of a provider response.
///
/// The label is kept exactly as the source named it; the consolidator
/// normalizes it into a [`SeriesId`](super::SeriesId).
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub label: String,
    pub observations: Vec<Observation>,
}

impl RawColumn {
    pub fn new(label: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            label: label.into(),
            observations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Drop observations dated before `start`.
    pub fn retain_from(&mut self, start: NaiveDate) {
        self.observations.retain(|o| o.date >= start);
    }
}

/// Result of one provider call: every column it returned, in response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFrame {
    pub columns: Vec<RawColumn>,
}

impl SeriesFrame {
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(RawColumn::is_empty)
    }

    /// Take the column carrying `label`, if the frame has one.
    pub fn take_column(&mut self, label: &str) -> Option<RawColumn> {
        let idx = self.columns.iter().position(|c| c.label == label)?;
        Some(self.columns.swap_remove(idx))
    }
}

/// A successfully fetched series, ready for consolidation.
pub type SeriesResult = RawColumn;
