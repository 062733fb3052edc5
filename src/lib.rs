//! Facade crate for the FoodPOI engine.
//!
//! This crate re-exports the record model, the query facade, the ingestion
//! pipeline and the viewport sync engine, with optional store implementations
//! behind feature flags.

#![forbid(unsafe_code)]

pub use foodpoi_core::{
    BoxHits, DEFAULT_QUERY_TIMEOUT, GeoQuery, MemoryPoiIndex, ParseError, PoiIndex, PoiRecord,
    PoiRecordError, QueryError, QueryHit, QueryResult, StoreError, decode_line, parse_line,
};
pub use foodpoi_data::{
    BatchFailure, BatchIngestor, BatchWriteError, IngestError, IngestOptions, IngestProgress,
    IngestSummary, LineRejection, PostalArea, PostalCollection, PostalError,
    load_pois_from_path, load_postal_areas_from_path,
};
pub use foodpoi_viewport::{
    DisplaySink, EngineClosed, EngineConfig, Marker, MarkerDelta, MarkerKey, MarkerSet,
    StateError, Surface, ViewportEvent, ViewportSyncEngine, ViewportSyncHandle, reconcile,
};

#[cfg(feature = "store-sqlite")]
pub use foodpoi_core::{SqlitePoiIndex, SqlitePoiIndexError};

#[cfg(feature = "store-elasticsearch")]
pub use foodpoi_data::elasticsearch::{
    ElasticsearchConfig, ElasticsearchPoiIndex, ElasticsearchPostalIndex,
};
