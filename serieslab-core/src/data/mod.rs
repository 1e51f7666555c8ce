//! Remote data access

pub mod provider;
pub mod sgs;

pub use provider::{DataError, SeriesProvider};
pub use sgs::{SgsProvider, SgsSettings, DEFAULT_BASE_URL};
