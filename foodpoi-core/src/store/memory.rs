//! In-process index backed by two R\*-trees.
//!
//! Box queries run against a planar tree over `[lon, lat]`. Nearest-neighbour
//! queries run against a tree over unit-sphere projections, so their order
//! matches great-circle order without a post-filter.

use std::{
    collections::HashMap,
    fmt,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use geo::{Coord, Rect};
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::PoiRecord;
use crate::geodesy::{haversine_km, unit_sphere};

use super::{BoxHits, PoiIndex, StoreError};

type PlanarEntry = GeomWithData<[f64; 2], String>;
type SphereEntry = GeomWithData<[f64; 3], String>;

#[derive(Default)]
struct Entries {
    records: HashMap<String, PoiRecord>,
    planar: RTree<PlanarEntry>,
    sphere: RTree<SphereEntry>,
}

impl Entries {
    fn upsert(&mut self, record: &PoiRecord) {
        if let Some(previous) = self.records.remove(record.id()) {
            self.planar.remove(&planar_entry(&previous));
            self.sphere.remove(&sphere_entry(&previous));
        }
        self.planar.insert(planar_entry(record));
        self.sphere.insert(sphere_entry(record));
        self.records.insert(record.id().to_owned(), record.clone());
    }
}

fn planar_entry(record: &PoiRecord) -> PlanarEntry {
    GeomWithData::new(
        [record.longitude(), record.latitude()],
        record.id().to_owned(),
    )
}

fn sphere_entry(record: &PoiRecord) -> SphereEntry {
    GeomWithData::new(unit_sphere(record.location()), record.id().to_owned())
}

/// Thread-safe in-memory [`PoiIndex`].
///
/// Re-upserting an id replaces the stored record and its tree entries.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use foodpoi_core::{MemoryPoiIndex, PoiRecord};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index = MemoryPoiIndex::from_records([
///     PoiRecord::new("1", 3, "Cafe Roma", Coord { x: 8.4, y: 49.0 })?,
/// ])?;
/// assert_eq!(index.len()?, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryPoiIndex {
    entries: RwLock<Entries>,
}

impl fmt::Debug for MemoryPoiIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.read().map(|entries| entries.records.len()).ok();
        f.debug_struct("MemoryPoiIndex")
            .field("entries", &size)
            .finish_non_exhaustive()
    }
}

impl MemoryPoiIndex {
    /// Build an index pre-populated with `records`.
    pub fn from_records<I>(records: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = PoiRecord>,
    {
        let index = Self::default();
        let records: Vec<PoiRecord> = records.into_iter().collect();
        index.upsert_blocking(&records)?;
        Ok(index)
    }

    /// Number of distinct ids held.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.records.len())
    }

    /// Whether the index holds no records.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Result<Option<PoiRecord>, StoreError> {
        Ok(self.read()?.records.get(id).cloned())
    }

    pub(crate) fn upsert_blocking(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        let mut entries = self.write()?;
        for record in records {
            entries.upsert(record);
        }
        Ok(())
    }

    pub(crate) fn nearest_blocking(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(StoreError::InvalidRequest {
                message: format!("query point ({}, {}) is not finite", point.y, point.x),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.read()?;
        let query = unit_sphere(point);
        let mut hits: Vec<(PoiRecord, f64)> = entries
            .sphere
            .nearest_neighbor_iter(&query)
            .take(k)
            .filter_map(|entry| entries.records.get(&entry.data))
            .map(|record| (record.clone(), haversine_km(point, record.location())))
            .collect();

        // Chord order and haversine order agree up to rounding on ties.
        hits.sort_by(|left, right| left.1.total_cmp(&right.1));
        Ok(hits)
    }

    pub(crate) fn within_blocking(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        let envelope =
            AABB::from_corners([bbox.min().x, bbox.min().y], [bbox.max().x, bbox.max().y]);
        let entries = self.read()?;
        let mut records: Vec<PoiRecord> = entries
            .planar
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| entries.records.get(&entry.data).cloned())
            .collect();
        records.sort_unstable_by(|left, right| left.id().cmp(right.id()));
        Ok(BoxHits::complete(records))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::unavailable("memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::unavailable("memory index lock poisoned"))
    }
}

#[async_trait]
impl PoiIndex for MemoryPoiIndex {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        self.upsert_blocking(records)
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        self.nearest_blocking(point, k)
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        self.within_blocking(bbox)
    }
}
