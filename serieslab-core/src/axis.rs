//! Canonical time axis.
//!
//! Every column of the consolidated table and every output sheet is laid
//! out on the same ordered list of period starts. The axis is built once
//! per run and shared read-only afterwards.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Granularity of the canonical axis. Each point is the first day of its period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Every calendar day.
    Daily,
    /// First day of each month.
    #[default]
    Monthly,
    /// First day of January, April, July and October.
    Quarterly,
    /// First day of each year.
    Annual,
}

impl Frequency {
    /// Start of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let (year, month) = match self {
            Frequency::Daily => return date,
            Frequency::Monthly => (date.year(), date.month()),
            Frequency::Quarterly => (date.year(), (date.month0() / 3) * 3 + 1),
            Frequency::Annual => (date.year(), 1),
        };
        // Day 1 exists for every valid year/month pair.
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
    }

    /// Start of the period following the one that begins at `start`.
    pub fn next_period(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => start.checked_add_days(Days::new(1)),
            Frequency::Monthly => start.checked_add_months(Months::new(1)),
            Frequency::Quarterly => start.checked_add_months(Months::new(3)),
            Frequency::Annual => start.checked_add_months(Months::new(12)),
        }
    }
}

/// Ordered, duplicate-free sequence of period starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    frequency: Frequency,
    dates: Vec<NaiveDate>,
}

impl TimeAxis {
    /// Build the axis of every period start falling within `[start, end]`.
    ///
    /// A start date inside a period begins the axis at the *next* period
    /// start, so `2010-01-15` on a monthly axis yields `2010-02-01` first.
    /// `start > end` produces an empty axis.
    pub fn build(start: NaiveDate, end: NaiveDate, frequency: Frequency) -> Self {
        let mut dates = Vec::new();

        let mut cursor = Some(frequency.period_start(start));
        if cursor.is_some_and(|first| first < start) {
            cursor = cursor.and_then(|first| frequency.next_period(first));
        }

        while let Some(date) = cursor {
            if date > end {
                break;
            }
            dates.push(date);
            cursor = frequency.next_period(date);
        }

        Self { frequency, dates }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Position of `date` on the axis, if it is one of the axis points.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }
}
