//! Request partitioning: dedupe, sort, split into fixed-size batches.

use crate::domain::SeriesId;

/// A group of identifiers fetched together in one combined call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in the partition (0-based).
    pub index: usize,
    pub ids: Vec<SeriesId>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// First identifier of the batch, used to name it in logs.
    pub fn head(&self) -> Option<SeriesId> {
        self.ids.first().copied()
    }
}

/// Split `ids` into batches of at most `batch_size` identifiers.
///
/// Duplicates are removed and the identifiers sorted ascending first, so the
/// batch composition is deterministic for a given input set. A `batch_size`
/// of zero is treated as one.
pub fn partition(ids: &[SeriesId], batch_size: usize) -> Vec<Batch> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    unique
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            ids: chunk.to_vec(),
        })
        .collect()
}
