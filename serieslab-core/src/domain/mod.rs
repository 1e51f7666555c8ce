//! Domain types for SeriesLab

pub mod ids;
pub mod outcome;
pub mod series;

pub use ids::{DatasetHash, SeriesId};
pub use outcome::{FetchOutcome, OutcomeKind};
pub use series::{Observation, RawColumn, SeriesFrame, SeriesResult};
