//! Deterministic dataset fingerprint.

use crate::consolidate::ConsolidatedTable;
use crate::domain::DatasetHash;

/// Compute a BLAKE3 hash over the consolidated table.
///
/// Covers the axis and every column in ascending series order, so two runs
/// that retrieved the same data produce the same hash regardless of which
/// batches finished first.
pub fn dataset_hash(table: &ConsolidatedTable) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    for date in table.axis().dates() {
        hasher.update(date.to_string().as_bytes());
    }

    for (id, values) in table.columns() {
        hasher.update(&id.code().to_le_bytes());
        for value in values {
            match value {
                Some(v) => {
                    hasher.update(&[1]);
                    hasher.update(&v.to_le_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
    }

    DatasetHash(hasher.finalize().to_hex().to_string())
}
