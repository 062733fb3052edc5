//! Query facade used by the viewport engine and the CLI.
//!
//! [`GeoQuery`] wraps a shared [`PoiIndex`] with a timeout and checks the
//! shape of every answer before handing it on: nearest-neighbour results must
//! be ordered and no longer than requested.

use std::{sync::Arc, time::Duration};

use geo::{Coord, Rect};
use thiserror::Error;

use crate::{PoiIndex, PoiRecord, PoiRecordError, StoreError, poi::validate_location};

/// Default bound on a single store round trip.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// One record returned by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// Matched record.
    pub record: PoiRecord,
    /// Great-circle distance from the query point; `None` for box queries.
    pub distance_km: Option<f64>,
}

/// Records returned by a query, with a truncation marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Matched records. Ordered by ascending distance for nearest queries.
    pub hits: Vec<QueryHit>,
    /// Set when the store returned fewer records than matched.
    pub truncated: bool,
}

impl QueryResult {
    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no records matched.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Failures surfaced by [`GeoQuery`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The store did not answer within the configured timeout.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    /// The store reported an error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The store answered with a result that breaks the query contract.
    #[error("malformed query result: {0}")]
    Malformed(String),
    /// The query point is not a valid WGS84 coordinate.
    #[error("invalid query point: {0}")]
    InvalidPoint(#[from] PoiRecordError),
}

/// Timeout-bounded access to a shared [`PoiIndex`].
///
/// # Examples
/// ```
/// use std::{sync::Arc, time::Duration};
/// use geo::Coord;
/// use foodpoi_core::{GeoQuery, MemoryPoiIndex, PoiRecord};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index = MemoryPoiIndex::from_records([
///     PoiRecord::new("1", 3, "Cafe Roma", Coord { x: 8.4, y: 49.0 })?,
/// ])?;
/// let query = GeoQuery::new(Arc::new(index), Duration::from_secs(1));
/// let result = query.nearest(Coord { x: 8.4, y: 49.0 }, 5).await?;
/// assert_eq!(result.hits[0].record.name(), "Cafe Roma");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeoQuery {
    index: Arc<dyn PoiIndex>,
    timeout: Duration,
}

impl std::fmt::Debug for GeoQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoQuery")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeoQuery {
    /// Wrap `index`, bounding every call by `timeout`.
    pub fn new(index: Arc<dyn PoiIndex>, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    /// Configured per-call timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return up to `k` records nearest to `point`, closest first.
    pub async fn nearest(&self, point: Coord<f64>, k: usize) -> Result<QueryResult, QueryError> {
        validate_location(point)?;
        let raw = tokio::time::timeout(self.timeout, self.index.k_nearest(point, k))
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))??;

        if raw.len() > k {
            return Err(QueryError::Malformed(format!(
                "asked for {k} records, store returned {}",
                raw.len()
            )));
        }
        // Written as a negation so NaN distances also fail.
        if let Some(position) = raw
            .windows(2)
            .position(|pair| !(pair[0].1 <= pair[1].1))
        {
            return Err(QueryError::Malformed(format!(
                "distances not ascending at position {}",
                position + 1
            )));
        }

        let hits = raw
            .into_iter()
            .map(|(record, distance)| QueryHit {
                record,
                distance_km: Some(distance),
            })
            .collect();
        Ok(QueryResult {
            hits,
            truncated: false,
        })
    }

    /// Return every record inside `bbox`, bounds inclusive.
    pub async fn within(&self, bbox: Rect<f64>) -> Result<QueryResult, QueryError> {
        validate_location(bbox.min())?;
        validate_location(bbox.max())?;
        let found = tokio::time::timeout(self.timeout, self.index.within_box(&bbox))
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))??;

        if found.truncated {
            log::warn!(
                "box query capped at {} records; the visible area holds more",
                found.records.len()
            );
        }

        let hits = found
            .records
            .into_iter()
            .map(|record| QueryHit {
                record,
                distance_km: None,
            })
            .collect();
        Ok(QueryResult {
            hits,
            truncated: found.truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingIndex, ScriptedIndex, SlowIndex};
    use crate::{BoxHits, MemoryPoiIndex};
    use rstest::{fixture, rstest};

    fn poi(id: &str, lon: f64, lat: f64) -> PoiRecord {
        PoiRecord::new(id, 1, format!("poi {id}"), Coord { x: lon, y: lat })
            .expect("valid test coordinate")
    }

    #[fixture]
    fn query() -> GeoQuery {
        let index = MemoryPoiIndex::from_records([
            poi("near", 8.405, 49.014),
            poi("mid", 8.45, 49.0),
            poi("far", 8.7, 49.4),
        ])
        .expect("populate index");
        GeoQuery::new(Arc::new(index), Duration::from_secs(1))
    }

    #[rstest]
    #[tokio::test]
    async fn nearest_is_ascending(query: GeoQuery) {
        let result = query
            .nearest(Coord { x: 8.404435, y: 49.013517 }, 5)
            .await
            .expect("query");
        let ids: Vec<&str> = result.hits.iter().map(|hit| hit.record.id()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        let distances: Vec<f64> = result
            .hits
            .iter()
            .filter_map(|hit| hit.distance_km)
            .collect();
        assert_eq!(distances.len(), 3);
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[rstest]
    #[tokio::test]
    async fn within_has_no_distances(query: GeoQuery) {
        let bbox = Rect::new(Coord { x: 8.4, y: 49.0 }, Coord { x: 8.5, y: 49.1 });
        let result = query.within(bbox).await.expect("query");
        assert_eq!(result.len(), 2);
        assert!(result.hits.iter().all(|hit| hit.distance_km.is_none()));
        assert!(!result.truncated);
    }

    #[rstest]
    #[tokio::test]
    async fn nearest_rejects_invalid_point(query: GeoQuery) {
        let err = query
            .nearest(Coord { x: 8.4, y: 91.0 }, 5)
            .await
            .expect_err("latitude out of range");
        assert_eq!(
            err,
            QueryError::InvalidPoint(PoiRecordError::LatitudeOutOfRange(91.0))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn store_failures_are_wrapped() {
        let query = GeoQuery::new(Arc::new(FailingIndex::default()), Duration::from_secs(1));
        let err = query
            .nearest(Coord { x: 8.4, y: 49.0 }, 5)
            .await
            .expect_err("failing store");
        assert!(matches!(err, QueryError::Store(StoreError::Unavailable { .. })));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out() {
        let slow = SlowIndex::new(MemoryPoiIndex::default(), Duration::from_secs(5));
        let query = GeoQuery::new(Arc::new(slow), Duration::from_millis(100));
        let bbox = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let err = query.within(bbox).await.expect_err("timeout");
        assert_eq!(err, QueryError::Timeout(Duration::from_millis(100)));
    }

    #[rstest]
    #[tokio::test]
    async fn unordered_store_answer_is_malformed() {
        let scripted =
            ScriptedIndex::nearest(vec![(poi("b", 1.0, 1.0), 2.0), (poi("a", 0.0, 0.0), 1.0)]);
        let query = GeoQuery::new(Arc::new(scripted), Duration::from_secs(1));
        let err = query
            .nearest(Coord { x: 0.0, y: 0.0 }, 5)
            .await
            .expect_err("descending distances");
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn oversized_store_answer_is_malformed() {
        let scripted =
            ScriptedIndex::nearest(vec![(poi("a", 0.0, 0.0), 1.0), (poi("b", 1.0, 1.0), 2.0)]);
        let query = GeoQuery::new(Arc::new(scripted), Duration::from_secs(1));
        let err = query
            .nearest(Coord { x: 0.0, y: 0.0 }, 1)
            .await
            .expect_err("too many hits");
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn truncation_is_reported() {
        let scripted = ScriptedIndex::within(BoxHits {
            records: vec![poi("a", 0.5, 0.5)],
            truncated: true,
        });
        let query = GeoQuery::new(Arc::new(scripted), Duration::from_secs(1));
        let bbox = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let result = query.within(bbox).await.expect("query");
        assert!(result.truncated);
        assert_eq!(result.len(), 1);
    }
}
