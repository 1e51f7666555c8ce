//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Partitioning covers every unique id exactly once, in ascending order
//! 2. Axis points are strictly increasing period starts inside the range
//! 3. Consolidated columns always match the axis length
//! 4. Column labels and indices are inverse of each other

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use serieslab_core::axis::{Frequency, TimeAxis};
use serieslab_core::consolidate::consolidate;
use serieslab_core::distribute::{column_index, column_letter, MAX_COLUMN};
use serieslab_core::domain::{Observation, RawColumn, SeriesId};
use serieslab_core::partition::partition;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_ids() -> impl Strategy<Value = Vec<SeriesId>> {
    prop::collection::vec(1u32..500, 0..80)
        .prop_map(|codes| codes.into_iter().filter_map(SeriesId::new).collect())
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..9000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

fn arb_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Monthly),
        Just(Frequency::Quarterly),
        Just(Frequency::Annual),
    ]
}

// ── 1. Partition coverage ────────────────────────────────────────────

proptest! {
    #[test]
    fn partition_concat_is_sorted_unique_input(ids in arb_ids(), size in 1usize..15) {
        let batches = partition(&ids, size);

        let mut expected = ids.clone();
        expected.sort_unstable();
        expected.dedup();

        let flat: Vec<SeriesId> = batches.iter().flat_map(|b| b.ids.clone()).collect();
        prop_assert_eq!(flat, expected);

        for (i, batch) in batches.iter().enumerate() {
            prop_assert_eq!(batch.index, i);
            prop_assert!(!batch.is_empty() && batch.len() <= size);
        }
        // Only the last batch may be short.
        for batch in batches.iter().rev().skip(1) {
            prop_assert_eq!(batch.len(), size);
        }
    }
}

// ── 2. Axis shape ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn axis_points_are_increasing_period_starts(
        start in arb_date(),
        span in 0u64..1500,
        freq in arb_frequency(),
    ) {
        let end = start.checked_add_days(Days::new(span)).unwrap();
        let axis = TimeAxis::build(start, end, freq);

        for date in axis.dates() {
            prop_assert!(*date >= start && *date <= end);
            prop_assert_eq!(freq.period_start(*date), *date);
        }
        for pair in axis.dates().windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }
}

// ── 3. Consolidation shape ───────────────────────────────────────────

proptest! {
    #[test]
    fn consolidated_columns_match_axis_length(
        dates in prop::collection::vec(arb_date(), 1..40),
        codes in prop::collection::vec(1u32..20, 1..6),
    ) {
        let axis = Arc::new(TimeAxis::build(
            NaiveDate::from_ymd_opt(2005, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2015, 12, 1).unwrap(),
            Frequency::Monthly,
        ));
        let results = codes.iter().map(|code| {
            RawColumn::new(
                code.to_string(),
                dates.iter().map(|&date| Observation::new(date, Some(1.0))).collect(),
            )
        });

        let out = consolidate(results, Arc::clone(&axis));
        for (_, values) in out.table.columns() {
            prop_assert_eq!(values.len(), axis.len());
        }

        let mut unique = codes.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(out.table.width(), unique.len());
    }
}

// ── 4. Column labels ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn column_letter_and_index_are_inverse(index in 1u32..=MAX_COLUMN) {
        let label = column_letter(index).unwrap();
        prop_assert_eq!(column_index(&label), Ok(index));
    }
}
