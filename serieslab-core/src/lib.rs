//! SeriesLab Core: the retrieval and reshaping pipeline for SGS time series.
//!
//! This crate holds everything that does not touch the filesystem or spawn
//! threads:
//! - Domain types (series ids, observations, fetch outcomes)
//! - The canonical time axis
//! - Batch partitioning of the requested series
//! - The SGS provider and the provider trait it implements
//! - Tiered fallback resolution of individual series
//! - Consolidation onto the axis and distribution onto output sheets

pub mod axis;
pub mod consolidate;
pub mod data;
pub mod distribute;
pub mod domain;
pub mod fingerprint;
pub mod partition;
pub mod resolve;
