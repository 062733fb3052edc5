//! SQLite-backed index for persisted POIs.
//!
//! Rows live in a single `pois` table keyed by id. Queries are answered from
//! an in-memory R\*-tree hydrated when the database is opened and kept in step
//! with every committed batch.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use geo::{Coord, Rect};
use rusqlite::{Connection, Transaction, params};
use thiserror::Error;

use crate::{PoiRecord, PoiRecordError};

use super::{BoxHits, MemoryPoiIndex, PoiIndex, StoreError};

const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pois (
    id TEXT PRIMARY KEY,
    category INTEGER NOT NULL,
    name TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL
)";

const UPSERT_ROW: &str =
    "INSERT OR REPLACE INTO pois (id, category, name, lat, lon) VALUES (?1, ?2, ?3, ?4, ?5)";

/// Errors raised while opening a SQLite index.
#[derive(Debug, Error)]
pub enum SqlitePoiIndexError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the `pois` table failed.
    #[error("failed to create pois table: {source}")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A persisted row carries coordinates outside the WGS84 ranges.
    #[error("stored POI {id} has an invalid location: {source}")]
    InvalidRow {
        /// Identifier of the offending row.
        id: String,
        /// Validation failure.
        #[source]
        source: PoiRecordError,
    },
    /// Generic SQLite error when reading rows.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    /// Hydrating the in-memory tree failed.
    #[error(transparent)]
    Index(#[from] StoreError),
}

/// Read-write [`PoiIndex`] persisted to a SQLite file.
pub struct SqlitePoiIndex {
    path: PathBuf,
    connection: Arc<Mutex<Connection>>,
    index: Arc<MemoryPoiIndex>,
}

impl fmt::Debug for SqlitePoiIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePoiIndex")
            .field("path", &self.path)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl SqlitePoiIndex {
    /// Open or create the database at `path` and load every stored row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqlitePoiIndexError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqlitePoiIndexError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        connection
            .execute(CREATE_SCHEMA, [])
            .map_err(|source| SqlitePoiIndexError::CreateSchema { source })?;

        let records = load_rows(&connection)?;
        log::debug!(
            "loaded {} POIs from {}",
            records.len(),
            path.display()
        );
        let index = MemoryPoiIndex::from_records(records)?;

        Ok(Self {
            path: path.to_path_buf(),
            connection: Arc::new(Mutex::new(connection)),
            index: Arc::new(index),
        })
    }

    /// Location of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_rows(connection: &Connection) -> Result<Vec<PoiRecord>, SqlitePoiIndexError> {
    let mut statement = connection.prepare("SELECT id, category, name, lat, lon FROM pois")?;
    let mut rows = statement.query([])?;
    let mut records = Vec::new();

    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let category: i32 = row.get(1)?;
        let name: String = row.get(2)?;
        let lat: f64 = row.get(3)?;
        let lon: f64 = row.get(4)?;
        let record = PoiRecord::new(id.clone(), category, name, Coord { x: lon, y: lat })
            .map_err(|source| SqlitePoiIndexError::InvalidRow { id, source })?;
        records.push(record);
    }

    Ok(records)
}

fn persist_rows(connection: &mut Connection, records: &[PoiRecord]) -> Result<(), StoreError> {
    let transaction = connection
        .transaction()
        .map_err(|source| StoreError::write_rejected(format!("begin transaction: {source}")))?;
    insert_rows(&transaction, records)?;
    transaction
        .commit()
        .map_err(|source| StoreError::write_rejected(format!("commit: {source}")))
}

fn insert_rows(transaction: &Transaction<'_>, records: &[PoiRecord]) -> Result<(), StoreError> {
    let mut statement = transaction
        .prepare_cached(UPSERT_ROW)
        .map_err(|source| StoreError::write_rejected(format!("prepare insert: {source}")))?;
    for record in records {
        statement
            .execute(params![
                record.id(),
                record.category(),
                record.name(),
                record.latitude(),
                record.longitude(),
            ])
            .map_err(|source| StoreError::WriteRejected {
                message: format!("persist POI {}: {source}", record.id()),
                failed_ids: vec![record.id().to_owned()],
            })?;
    }
    Ok(())
}

#[async_trait]
impl PoiIndex for SqlitePoiIndex {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        let connection = Arc::clone(&self.connection);
        let index = Arc::clone(&self.index);
        let records = records.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut connection = connection
                .lock()
                .map_err(|_| StoreError::unavailable("SQLite connection lock poisoned"))?;
            persist_rows(&mut connection, &records)?;
            index.upsert_blocking(&records)
        })
        .await
        .map_err(|source| StoreError::unavailable(format!("SQLite writer task failed: {source}")))?
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        self.index.nearest_blocking(point, k)
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        self.index.within_blocking(bbox)
    }
}
