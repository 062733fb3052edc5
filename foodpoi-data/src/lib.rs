//! Loading and remote storage of FoodPOI records.
//!
//! Responsibilities:
//! - Stream a line-oriented POI export into any [`foodpoi_core::PoiIndex`]
//!   in fixed-size batches with bounded write concurrency.
//! - Read postal-code areas from a GeoJSON `FeatureCollection`.
//! - Provide an Elasticsearch-backed index behind the
//!   `store-elasticsearch` feature.
//!
//! Boundaries:
//! - Parsing rules and query semantics live in `foodpoi-core`.
//! - File access goes through `foodpoi-fs`.
//!
//! Invariants:
//! - A bad line never aborts a load; it is reported in the summary.
//! - Failed batches are collected, never dropped silently.

pub mod ingest;
pub mod postal;
mod source;

#[cfg(feature = "store-elasticsearch")]
pub mod elasticsearch;

pub use ingest::{
    BatchFailure, BatchIngestor, BatchWriteError, IngestError, IngestOptions, IngestProgress,
    IngestSummary, LineRejection,
};
pub use postal::{PostalArea, PostalCollection, PostalError, load_postal_areas_from_path};
pub use source::load_pois_from_path;
