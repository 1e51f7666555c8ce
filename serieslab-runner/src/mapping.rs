//! Series mapping: which series goes to which sheet and column.
//!
//! The mapping is a CSV with at least the headers `Codigo`, `Coluna` and
//! `Aba`; any other columns are ignored.

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use serieslab_core::distribute::MappingRow;
use serieslab_core::domain::SeriesId;

pub const CODE_HEADER: &str = "Codigo";
pub const COLUMN_HEADER: &str = "Coluna";
pub const SHEET_HEADER: &str = "Aba";

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("cannot open series mapping {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed series mapping: {0}")]
    Csv(#[from] csv::Error),

    #[error("series mapping has no '{0}' column")]
    MissingColumn(&'static str),
}

/// Cleaned mapping rows, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMapping {
    pub rows: Vec<MappingRow>,
    /// Rows dropped during cleaning.
    pub dropped: usize,
}

impl SeriesMapping {
    /// Every mapped identifier, in file order, repeats included.
    pub fn ids(&self) -> Vec<SeriesId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load the mapping CSV at `path`.
pub fn load_mapping(path: &Path) -> Result<SeriesMapping, MappingError> {
    let file = std::fs::File::open(path).map_err(|source| MappingError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_mapping(file)
}

/// Read and clean a mapping from any CSV source.
pub fn read_mapping<R: Read>(source: R) -> Result<SeriesMapping, MappingError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(MappingError::MissingColumn(name))
    };
    let code_at = position(CODE_HEADER)?;
    let column_at = position(COLUMN_HEADER)?;
    let sheet_at = position(SHEET_HEADER)?;

    let mut mapping = SeriesMapping::default();
    for record in reader.records() {
        let record = record?;
        let field = |at: usize| record.get(at).unwrap_or("").trim();

        let (code, column, sheet) = (field(code_at), field(column_at), field(sheet_at));
        if code.is_empty() || sheet.is_empty() {
            mapping.dropped += 1;
            continue;
        }
        let Some(id) = SeriesId::coerce(code) else {
            tracing::debug!(code, "mapping row dropped: not a valid series code");
            mapping.dropped += 1;
            continue;
        };

        mapping.rows.push(MappingRow {
            id,
            column: column.to_uppercase(),
            sheet: sheet.to_string(),
        });
    }

    Ok(mapping)
}
