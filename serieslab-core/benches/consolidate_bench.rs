//! Criterion benchmarks for the reshaping hot paths.
//!
//! Benchmarks:
//! 1. Consolidation of many series onto a daily axis
//! 2. Distribution of a wide table across several sheets

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use serieslab_core::axis::{Frequency, TimeAxis};
use serieslab_core::consolidate::{consolidate, ConsolidatedTable};
use serieslab_core::distribute::{column_letter, distribute, MappingRow};
use serieslab_core::domain::{Observation, RawColumn, SeriesId, SeriesResult};

// ── Helpers ──────────────────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()
}

fn make_axis(days: u64) -> Arc<TimeAxis> {
    let end = base_date().checked_add_days(Days::new(days - 1)).unwrap();
    Arc::new(TimeAxis::build(base_date(), end, Frequency::Daily))
}

fn make_results(series: u32, days: u64) -> Vec<SeriesResult> {
    (1..=series)
        .map(|code| {
            let observations = (0..days)
                .step_by(2)
                .map(|i| {
                    let date = base_date().checked_add_days(Days::new(i)).unwrap();
                    Observation::new(date, Some((i as f64 * 0.1).sin() * code as f64))
                })
                .collect();
            RawColumn::new(code.to_string(), observations)
        })
        .collect()
}

fn make_table(series: u32, days: u64) -> ConsolidatedTable {
    consolidate(make_results(series, days), make_axis(days)).table
}

// ── 1. Consolidation ─────────────────────────────────────────────────

fn bench_consolidate(c: &mut Criterion) {
    let mut group = c.benchmark_group("consolidate");

    for &series in &[10u32, 100, 500] {
        let axis = make_axis(3650);
        let results = make_results(series, 3650);

        group.bench_with_input(BenchmarkId::new("daily_10y", series), &series, |b, _| {
            b.iter(|| consolidate(black_box(results.clone()), Arc::clone(&axis)));
        });
    }

    group.finish();
}

// ── 2. Distribution ──────────────────────────────────────────────────

fn bench_distribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribute");

    for &series in &[50u32, 500] {
        let table = make_table(series, 3650);
        let rows: Vec<MappingRow> = (1..=series)
            .filter_map(|code| {
                Some(MappingRow {
                    id: SeriesId::new(code)?,
                    column: column_letter(code % 40 + 2)?,
                    sheet: format!("Sheet{}", code % 5),
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("five_sheets", series), &series, |b, _| {
            b.iter(|| distribute(black_box(&table), black_box(&rows)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_consolidate, bench_distribute);
criterion_main!(benches);
