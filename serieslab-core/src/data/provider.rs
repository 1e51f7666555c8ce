//! Series provider trait and structured error types.
//!
//! The SeriesProvider trait abstracts over the remote statistical source so
//! the pipeline can run against the SGS HTTP API in production and against
//! scripted providers in tests.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{SeriesFrame, SeriesId};

/// Structured error types for provider calls.
///
/// Every variant is recoverable from the pipeline's point of view: a failed
/// combined call degrades to per-series resolution, and a failed per-series
/// call moves on to the next tier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for series {id}")]
    Http { status: u16, id: SeriesId },

    #[error("series not found: {id}")]
    SeriesNotFound { id: SeriesId },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("empty request: no series identifiers given")]
    EmptyRequest,

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for remote time-series sources.
///
/// A call covers one or many identifiers and either returns data for the
/// request or fails as a whole; no partial success is reported. An `Ok`
/// frame may still be empty when the source has nothing in range.
///
/// Implementations are shared across worker threads.
pub trait SeriesProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the given series, optionally bounded below by `start`.
    ///
    /// Columns in the returned frame are labelled with each series' code.
    fn fetch(&self, ids: &[SeriesId], start: Option<NaiveDate>) -> Result<SeriesFrame, DataError>;
}
