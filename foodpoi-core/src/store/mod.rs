//! Storage seam for points of interest.
//!
//! The [`PoiIndex`] trait is the only contract the ingestion and query paths
//! rely on: write a batch, ask for the `k` nearest records, or ask for every
//! record inside a box. Implementations must be safe to share across tasks;
//! the ingestor writes through the same `Arc` the viewport queries read from.

use async_trait::async_trait;
use geo::{Coord, Rect};
use thiserror::Error;

use crate::PoiRecord;

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryPoiIndex;
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqlitePoiIndex, SqlitePoiIndexError};

/// Records returned by [`PoiIndex::within_box`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxHits {
    /// Records inside the box, in no particular order.
    pub records: Vec<PoiRecord>,
    /// Set when the backend capped the response below the true match count.
    pub truncated: bool,
}

impl BoxHits {
    /// Wrap a complete, untruncated result set.
    pub const fn complete(records: Vec<PoiRecord>) -> Self {
        Self {
            records,
            truncated: false,
        }
    }
}

/// Failures reported by a [`PoiIndex`] backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unreachable: {message}")]
    Unavailable {
        /// Backend-specific description.
        message: String,
    },
    /// The backend rejected a write.
    #[error("store rejected write: {message}")]
    WriteRejected {
        /// Backend-specific description.
        message: String,
        /// Identifiers of the records the backend reported as failed.
        failed_ids: Vec<String>,
    },
    /// The backend answered with data that could not be interpreted.
    #[error("malformed store response: {message}")]
    Malformed {
        /// What was wrong with the response.
        message: String,
    },
    /// A request parameter was outside what the backend supports.
    #[error("invalid store request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },
}

impl StoreError {
    /// Build an [`StoreError::Unavailable`] from any displayable cause.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Build a whole-batch [`StoreError::WriteRejected`].
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected {
            message: message.into(),
            failed_ids: Vec::new(),
        }
    }

    /// Build a [`StoreError::Malformed`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Read-write access to indexed points of interest.
///
/// Coordinates use WGS84 with `x = longitude` and `y = latitude`. Distances
/// are great-circle kilometres.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use geo::{Coord, Rect};
/// use foodpoi_core::{MemoryPoiIndex, PoiIndex, PoiRecord};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index: Arc<dyn PoiIndex> = Arc::new(MemoryPoiIndex::default());
/// let poi = PoiRecord::new("1", 3, "Cafe Roma", Coord { x: 8.4, y: 49.0 })?;
/// index.upsert_batch(&[poi.clone()]).await?;
///
/// let nearest = index.k_nearest(Coord { x: 8.41, y: 49.01 }, 5).await?;
/// assert_eq!(nearest.len(), 1);
///
/// let bbox = Rect::new(Coord { x: 8.0, y: 48.0 }, Coord { x: 9.0, y: 50.0 });
/// let hits = index.within_box(&bbox).await?;
/// assert_eq!(hits.records, vec![poi]);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait PoiIndex: Send + Sync {
    /// Insert or replace every record by id as one unit of work.
    ///
    /// Backends without partial-batch semantics fail the whole batch.
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError>;

    /// Return up to `k` records ordered by ascending distance from `point`,
    /// paired with that distance in kilometres.
    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError>;

    /// Return every record inside `bbox`; boundary points are included.
    ///
    /// Boxes crossing the antimeridian are not modelled. Callers needing them
    /// split the area into two boxes.
    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn write_rejected_helper_has_no_failed_ids() {
        let err = StoreError::write_rejected("disk full");
        assert_eq!(
            err,
            StoreError::WriteRejected {
                message: "disk full".into(),
                failed_ids: Vec::new(),
            }
        );
        assert_eq!(err.to_string(), "store rejected write: disk full");
    }

    #[rstest]
    fn complete_hits_are_not_truncated() {
        assert!(!BoxHits::complete(Vec::new()).truncated);
    }
}
