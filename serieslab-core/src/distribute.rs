//! Distribution of consolidated columns onto output sheets.
//!
//! Each sheet spans the contiguous column range from the lowest to the
//! highest destination column configured for it, inclusive. Columns inside
//! the range that nothing maps to, or whose series has no data, stay empty.

use std::sync::Arc;

use thiserror::Error;

use crate::axis::TimeAxis;
use crate::consolidate::ConsolidatedTable;
use crate::domain::SeriesId;

/// Highest column a worksheet can address (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnLabelError {
    #[error("empty column label")]
    Empty,

    #[error("invalid column label '{0}'")]
    Invalid(String),

    #[error("column label '{0}' is beyond the last worksheet column")]
    OutOfRange(String),
}

/// 1-based index of a column label: `A` → 1, `Z` → 26, `AA` → 27.
pub fn column_index(label: &str) -> Result<u32, ColumnLabelError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ColumnLabelError::Empty);
    }
    if label.len() > 3 || !label.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ColumnLabelError::Invalid(label.to_string()));
    }

    let index = label
        .bytes()
        .map(|b| u32::from(b.to_ascii_uppercase() - b'A') + 1)
        .fold(0u32, |acc, digit| acc * 26 + digit);

    if index > MAX_COLUMN {
        return Err(ColumnLabelError::OutOfRange(label.to_string()));
    }
    Ok(index)
}

/// Column label for a 1-based index. `None` for 0 or past `XFD`.
pub fn column_letter(index: u32) -> Option<String> {
    if index == 0 || index > MAX_COLUMN {
        return None;
    }

    let mut n = index;
    let mut letters = Vec::with_capacity(3);
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).ok()
}

/// One cleaned configuration row: where a series goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRow {
    pub id: SeriesId,
    /// Destination column label, uppercase.
    pub column: String,
    /// Destination sheet name.
    pub sheet: String,
}

/// One column of an output sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetColumn {
    pub label: String,
    /// Series copied into this column, if any.
    pub source: Option<SeriesId>,
    /// Axis-aligned values; all `None` for an empty column.
    pub values: Vec<Option<f64>>,
}

/// An output sheet laid out on the canonical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub axis: Arc<TimeAxis>,
    pub columns: Vec<SheetColumn>,
}

impl SheetTable {
    pub fn column(&self, label: &str) -> Option<&SheetColumn> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Columns that received data.
    pub fn filled_columns(&self) -> usize {
        self.columns.iter().filter(|c| c.source.is_some()).count()
    }
}

/// A sheet left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSheet {
    pub name: String,
    pub reason: ColumnLabelError,
}

/// Output of [`distribute`].
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    pub sheets: Vec<SheetTable>,
    pub skipped: Vec<SkippedSheet>,
}

/// Lay out one sheet per distinct sheet name, in order of first appearance.
///
/// A sheet with any unparseable destination column is skipped as a whole.
/// Rows apply in order, so a later row mapped to the same column overwrites
/// an earlier one when both series are present.
pub fn distribute(table: &ConsolidatedTable, rows: &[MappingRow]) -> Distribution {
    let mut distribution = Distribution::default();

    for (sheet, sheet_rows) in group_by_sheet(rows) {
        match layout_sheet(table, sheet, &sheet_rows) {
            Ok(sheet_table) => distribution.sheets.push(sheet_table),
            Err(reason) => {
                tracing::warn!(sheet, %reason, "sheet skipped: invalid destination column");
                distribution.skipped.push(SkippedSheet {
                    name: sheet.to_string(),
                    reason,
                });
            }
        }
    }

    distribution
}

fn group_by_sheet(rows: &[MappingRow]) -> Vec<(&str, Vec<&MappingRow>)> {
    let mut groups: Vec<(&str, Vec<&MappingRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(name, _)| *name == row.sheet) {
            Some((_, members)) => members.push(row),
            None => groups.push((row.sheet.as_str(), vec![row])),
        }
    }
    groups
}

fn layout_sheet(
    table: &ConsolidatedTable,
    sheet: &str,
    rows: &[&MappingRow],
) -> Result<SheetTable, ColumnLabelError> {
    let indices = rows
        .iter()
        .map(|row| column_index(&row.column))
        .collect::<Result<Vec<u32>, _>>()?;

    let axis = Arc::clone(table.axis());
    let (Some(&lo), Some(&hi)) = (indices.iter().min(), indices.iter().max()) else {
        return Ok(SheetTable {
            name: sheet.to_string(),
            axis,
            columns: Vec::new(),
        });
    };

    let mut columns: Vec<SheetColumn> = (lo..=hi)
        .filter_map(column_letter)
        .map(|label| SheetColumn {
            label,
            source: None,
            values: vec![None; axis.len()],
        })
        .collect();

    for (row, &index) in rows.iter().zip(&indices) {
        if let Some(values) = table.column(row.id) {
            let slot = &mut columns[(index - lo) as usize];
            slot.source = Some(row.id);
            slot.values = values.to_vec();
        }
    }

    Ok(SheetTable {
        name: sheet.to_string(),
        axis,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Frequency;
    use crate::consolidate::consolidate;
    use crate::domain::{Observation, RawColumn};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn id(code: u32) -> SeriesId {
        SeriesId::new(code).unwrap()
    }

    fn row(code: u32, column: &str, sheet: &str) -> MappingRow {
        MappingRow {
            id: id(code),
            column: column.to_string(),
            sheet: sheet.to_string(),
        }
    }

    fn table_with(codes: &[u32]) -> ConsolidatedTable {
        let axis = Arc::new(TimeAxis::build(d(2010, 1, 1), d(2010, 2, 1), Frequency::Monthly));
        let results = codes.iter().map(|c| {
            RawColumn::new(
                c.to_string(),
                vec![Observation::new(d(2010, 1, 1), Some(*c as f64))],
            )
        });
        consolidate(results, axis).table
    }

    #[test]
    fn column_letters_round_trip_known_points() {
        assert_eq!(column_index("A"), Ok(1));
        assert_eq!(column_index("z"), Ok(26));
        assert_eq!(column_index("AA"), Ok(27));
        assert_eq!(column_index("XFD"), Ok(MAX_COLUMN));
        assert_eq!(column_letter(27).as_deref(), Some("AA"));
        assert_eq!(column_letter(702).as_deref(), Some("ZZ"));
        assert_eq!(column_letter(703).as_deref(), Some("AAA"));
        assert_eq!(column_letter(0), None);
    }

    #[test]
    fn column_index_rejects_bad_labels() {
        assert_eq!(column_index(""), Err(ColumnLabelError::Empty));
        assert!(matches!(column_index("A1"), Err(ColumnLabelError::Invalid(_))));
        assert!(matches!(column_index("ABCD"), Err(ColumnLabelError::Invalid(_))));
        assert!(matches!(column_index("XFE"), Err(ColumnLabelError::OutOfRange(_))));
    }

    #[test]
    fn range_spans_min_to_max_with_gaps_empty() {
        let table = table_with(&[1, 2]);
        let out = distribute(&table, &[row(1, "B", "Juros"), row(2, "D", "Juros")]);

        let sheet = &out.sheets[0];
        assert_eq!(sheet.column_labels(), vec!["B", "C", "D"]);
        assert_eq!(sheet.column("B").unwrap().values, vec![Some(1.0), None]);
        assert_eq!(sheet.column("C").unwrap().values, vec![None, None]);
        assert_eq!(sheet.column("C").unwrap().source, None);
        assert_eq!(sheet.column("D").unwrap().values, vec![Some(2.0), None]);
    }

    #[test]
    fn missing_series_leaves_column_empty() {
        let table = table_with(&[1]);
        let out = distribute(&table, &[row(1, "B", "S"), row(77, "C", "S")]);
        let sheet = &out.sheets[0];
        assert_eq!(sheet.filled_columns(), 1);
        assert!(sheet.column("C").unwrap().values.iter().all(Option::is_none));
    }

    #[test]
    fn sheets_keep_first_appearance_order() {
        let table = table_with(&[1, 2]);
        let out = distribute(
            &table,
            &[row(1, "B", "Zeta"), row(2, "B", "Alpha"), row(2, "C", "Zeta")],
        );
        let names: Vec<&str> = out.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(out.sheets[0].column_labels(), vec!["B", "C"]);
    }

    #[test]
    fn invalid_column_skips_whole_sheet() {
        let table = table_with(&[1, 2]);
        let out = distribute(
            &table,
            &[row(1, "B", "Bad"), row(2, "??", "Bad"), row(2, "B", "Good")],
        );
        assert_eq!(out.sheets.len(), 1);
        assert_eq!(out.sheets[0].name, "Good");
        assert_eq!(out.skipped[0].name, "Bad");
    }

    #[test]
    fn later_row_overwrites_same_destination() {
        let table = table_with(&[1, 2]);
        let out = distribute(&table, &[row(1, "B", "S"), row(2, "B", "S")]);
        assert_eq!(out.sheets[0].column("B").unwrap().source, Some(id(2)));
    }
}
