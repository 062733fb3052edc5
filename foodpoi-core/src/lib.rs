//! Core domain types for the FoodPOI engine.
//!
//! This crate holds the validated [`PoiRecord`], the line [`parser`], the
//! [`PoiIndex`] storage seam with its in-memory and SQLite implementations,
//! and the [`GeoQuery`] facade that bounds and checks every query.

pub mod geodesy;
pub mod parser;
mod poi;
pub mod query;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use parser::{ParseError, decode_line, parse_line};
pub use poi::{PoiRecord, PoiRecordError, validate_location};
pub use query::{DEFAULT_QUERY_TIMEOUT, GeoQuery, QueryError, QueryHit, QueryResult};
pub use store::{BoxHits, MemoryPoiIndex, PoiIndex, StoreError};
#[cfg(feature = "store-sqlite")]
pub use store::{SqlitePoiIndex, SqlitePoiIndexError};
