//! Shared fixtures for core integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDate;
use serieslab_core::data::{DataError, SeriesProvider};
use serieslab_core::domain::{Observation, RawColumn, SeriesFrame, SeriesId};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn id(code: u32) -> SeriesId {
    SeriesId::new(code).unwrap()
}

/// In-memory provider with per-series failure switches.
///
/// Multi-series calls fail as a whole when any member would fail, or when
/// `fail_combined` is set.
#[derive(Default)]
pub struct ScriptedProvider {
    history: HashMap<SeriesId, Vec<Observation>>,
    fail_combined: bool,
    strict_failures: HashSet<SeriesId>,
    full_failures: HashSet<SeriesId>,
    calls: Mutex<Vec<(Vec<SeriesId>, bool)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, code: u32, points: &[(NaiveDate, f64)]) -> Self {
        let obs = points
            .iter()
            .map(|&(date, v)| Observation::new(date, Some(v)))
            .collect();
        self.history.insert(id(code), obs);
        self
    }

    pub fn failing_combined(mut self) -> Self {
        self.fail_combined = true;
        self
    }

    pub fn failing_strict(mut self, code: u32) -> Self {
        self.strict_failures.insert(id(code));
        self
    }

    pub fn failing_full(mut self, code: u32) -> Self {
        self.full_failures.insert(id(code));
        self
    }

    /// Every call so far: requested ids and whether a start date was sent.
    pub fn calls(&self) -> Vec<(Vec<SeriesId>, bool)> {
        self.calls.lock().unwrap().clone()
    }

    fn column(&self, id: SeriesId, start: Option<NaiveDate>) -> Result<RawColumn, DataError> {
        let failing = match start {
            Some(_) => &self.strict_failures,
            None => &self.full_failures,
        };
        if failing.contains(&id) {
            return Err(DataError::NetworkUnreachable(format!("scripted failure for {id}")));
        }
        let history = self
            .history
            .get(&id)
            .ok_or(DataError::SeriesNotFound { id })?;
        let mut column = RawColumn::new(id.to_string(), history.clone());
        if let Some(start) = start {
            column.retain_from(start);
        }
        Ok(column)
    }
}

impl SeriesProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, ids: &[SeriesId], start: Option<NaiveDate>) -> Result<SeriesFrame, DataError> {
        self.calls.lock().unwrap().push((ids.to_vec(), start.is_some()));
        if ids.is_empty() {
            return Err(DataError::EmptyRequest);
        }
        if ids.len() > 1 && self.fail_combined {
            return Err(DataError::Http {
                status: 500,
                id: ids[0],
            });
        }
        let columns = ids
            .iter()
            .map(|&id| self.column(id, start))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SeriesFrame::new(columns))
    }
}
