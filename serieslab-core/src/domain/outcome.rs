//! Terminal state of resolving one series.

use serde::{Deserialize, Serialize};

use super::series::SeriesResult;

/// What became of one series after every applicable fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// At least one observation on or after the start date was retrieved.
    Succeeded(SeriesResult),
    /// The source answered, but nothing falls on or after the start date.
    NoDataInPeriod,
    /// Every tier errored. The series is dropped from the run.
    PermanentlyFailed { reason: String },
}

impl FetchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Succeeded(_) => OutcomeKind::Succeeded,
            Self::NoDataInPeriod => OutcomeKind::NoDataInPeriod,
            Self::PermanentlyFailed { .. } => OutcomeKind::PermanentlyFailed,
        }
    }

    pub fn into_result(self) -> Option<SeriesResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

/// Payload-free form of [`FetchOutcome`], used for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Succeeded,
    NoDataInPeriod,
    PermanentlyFailed,
}
