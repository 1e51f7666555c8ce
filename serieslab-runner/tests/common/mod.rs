//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use serieslab_core::data::{DataError, SeriesProvider};
use serieslab_core::domain::{Observation, RawColumn, SeriesFrame, SeriesId};
use serieslab_runner::PipelineConfig;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn id(code: u32) -> SeriesId {
    SeriesId::new(code).unwrap()
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub ids: Vec<SeriesId>,
    pub windowed: bool,
}

/// In-memory provider with failure and panic switches.
#[derive(Default)]
pub struct ScriptedProvider {
    history: HashMap<SeriesId, Vec<Observation>>,
    fail_combined: bool,
    strict_failures: HashSet<SeriesId>,
    full_failures: HashSet<SeriesId>,
    panics: HashSet<SeriesId>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monthly points starting at `first`, one per value.
    pub fn with_monthly(mut self, code: u32, first: NaiveDate, values: &[f64]) -> Self {
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let date = first.checked_add_months(chrono::Months::new(i as u32)).unwrap();
                Observation::new(date, Some(v))
            })
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

    /// Any call that includes `code` panics.
    pub fn panicking_on(mut self, code: u32) -> Self {
        self.panics.insert(id(code));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Single-series calls made for `code`.
    pub fn resolutions_of(&self, code: u32) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.ids == vec![id(code)])
            .count()
    }

    fn column(&self, id: SeriesId, start: Option<NaiveDate>) -> Result<RawColumn, DataError> {
        let failing = if start.is_some() {
            &self.strict_failures
        } else {
            &self.full_failures
        };
        if failing.contains(&id) {
            return Err(DataError::NetworkUnreachable(format!("scripted failure for {id}")));
        }
        let history = self.history.get(&id).ok_or(DataError::SeriesNotFound { id })?;
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
        self.calls.lock().unwrap().push(Call {
            ids: ids.to_vec(),
            windowed: start.is_some(),
        });
        if let Some(bad) = ids.iter().find(|id| self.panics.contains(id)) {
            panic!("scripted panic while fetching {bad}");
        }
        if ids.len() > 1 && self.fail_combined {
            return Err(DataError::Http {
                status: 503,
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

/// Config for a run over 2010-01..2010-06 writing into `dir`.
pub fn config_in(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.run.start_date = d(2010, 1, 1);
    config.run.end_date = Some(d(2010, 6, 1));
    config.run.max_workers = 3;
    config.input.series = dir.join("series.csv");
    config.output.directory = dir.join("Resultado_BCB");
    config.output.backup = Some(dir.join("Resultado_BCB_BACKUP"));
    config
}

pub fn write_mapping(dir: &Path, rows: &[(u32, &str, &str)]) {
    let mut text = String::from("Codigo,Coluna,Aba\n");
    for (code, column, sheet) in rows {
        text.push_str(&format!("{code},{column},{sheet}\n"));
    }
    std::fs::write(dir.join("series.csv"), text).unwrap();
}
