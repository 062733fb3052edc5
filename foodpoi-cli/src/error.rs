//! Error types emitted by the FoodPOI CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use foodpoi_core::QueryError;
use foodpoi_data::{IngestError, PostalError};
use thiserror::Error;

/// Errors emitted by the FoodPOI CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Option name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Options that select different stores were combined.
    #[error("--{first} and --{second} select different stores; pass only one")]
    ConflictingStores {
        /// First option.
        first: &'static str,
        /// Second option.
        second: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        /// Cargo feature name.
        feature: &'static str,
        /// What the user asked for.
        action: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Option that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Option that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Option that named the path.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The directory for the database could not be created.
    #[error("failed to prepare database directory for {path:?}: {source}")]
    PrepareDatabase {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite index failed.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    OpenSqlite(#[from] foodpoi_core::SqlitePoiIndexError),
    /// Building the Elasticsearch client failed.
    #[cfg(feature = "store-elasticsearch")]
    #[error(transparent)]
    BuildElasticsearch(#[from] foodpoi_data::elasticsearch::ElasticsearchBuildError),
    /// Preparing the Elasticsearch index failed.
    #[error("failed to prepare index {index:?}: {source}")]
    PrepareIndex {
        /// Index name.
        index: String,
        /// Store failure.
        #[source]
        source: foodpoi_core::StoreError,
    },
    /// Writing postal areas to Elasticsearch failed.
    #[error("failed to write postal areas to index {index:?}: {source}")]
    WritePostalAreas {
        /// Index name.
        index: String,
        /// Store failure.
        #[source]
        source: foodpoi_core::StoreError,
    },
    /// Building the async runtime failed.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Loading the POI export failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// Reading the postal-area GeoJSON failed.
    #[error(transparent)]
    Postal(#[from] PostalError),
    /// A query failed.
    #[error("query failed: {0}")]
    Query(#[from] QueryError),
    /// Serialising a report failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing a report failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
