//! Elasticsearch-backed [`foodpoi_core::PoiIndex`].
//!
//! Records are stored as documents with a `geo_point` field named `location`.
//! Writes go through the `_bulk` API; nearest-neighbour queries sort by
//! `_geo_distance` in kilometres and box queries filter with
//! `geo_bounding_box`.
//!
//! Postal-code areas live in a separate index with a `geo_shape` field, see
//! [`ElasticsearchPostalIndex`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use foodpoi_data::elasticsearch::{ElasticsearchConfig, ElasticsearchPoiIndex};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ElasticsearchConfig::new("http://localhost:9200")
//!     .with_index("foodpoi")
//!     .with_timeout(Duration::from_secs(30));
//! let index = ElasticsearchPoiIndex::with_config(config)?;
//! index.ensure_index().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dto;
mod postal;
mod provider;

pub use config::{
    DEFAULT_ELASTICSEARCH_TIMEOUT, DEFAULT_INDEX_NAME, DEFAULT_POSTAL_INDEX_NAME,
    DEFAULT_RESULT_WINDOW, ElasticsearchConfig,
};
pub use postal::ElasticsearchPostalIndex;
pub use provider::{ElasticsearchBuildError, ElasticsearchPoiIndex};
