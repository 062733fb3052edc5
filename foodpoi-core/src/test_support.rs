//! Test doubles for [`PoiIndex`] shared by unit and behaviour tests across the
//! workspace.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use geo::{Coord, Rect};

use crate::{BoxHits, PoiIndex, PoiRecord, StoreError};

/// Index that fails every call with [`StoreError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingIndex;

#[async_trait]
impl PoiIndex for FailingIndex {
    async fn upsert_batch(&self, _records: &[PoiRecord]) -> Result<(), StoreError> {
        Err(StoreError::unavailable("failing index"))
    }

    async fn k_nearest(
        &self,
        _point: Coord<f64>,
        _k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        Err(StoreError::unavailable("failing index"))
    }

    async fn within_box(&self, _bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        Err(StoreError::unavailable("failing index"))
    }
}

/// Index returning canned answers regardless of the request.
#[derive(Debug, Default, Clone)]
pub struct ScriptedIndex {
    nearest: Vec<(PoiRecord, f64)>,
    within: BoxHits,
}

impl ScriptedIndex {
    /// Answer every nearest query with `hits`, verbatim.
    pub fn nearest(hits: Vec<(PoiRecord, f64)>) -> Self {
        Self {
            nearest: hits,
            within: BoxHits::default(),
        }
    }

    /// Answer every box query with `hits`, verbatim.
    pub fn within(hits: BoxHits) -> Self {
        Self {
            nearest: Vec::new(),
            within: hits,
        }
    }
}

#[async_trait]
impl PoiIndex for ScriptedIndex {
    async fn upsert_batch(&self, _records: &[PoiRecord]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn k_nearest(
        &self,
        _point: Coord<f64>,
        _k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        Ok(self.nearest.clone())
    }

    async fn within_box(&self, _bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        Ok(self.within.clone())
    }
}

/// Wrapper delaying every call by a fixed duration on the tokio clock.
#[derive(Debug)]
pub struct SlowIndex<I> {
    inner: I,
    delay: Duration,
}

impl<I> SlowIndex<I> {
    /// Delay each call to `inner` by `delay`.
    pub const fn new(inner: I, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<I: PoiIndex> PoiIndex for SlowIndex<I> {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert_batch(records).await
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.k_nearest(point, k).await
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.within_box(bbox).await
    }
}

/// Wrapper counting calls and recording batch sizes.
#[derive(Debug, Default)]
pub struct CountingIndex<I> {
    inner: I,
    nearest_calls: AtomicUsize,
    within_calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl<I> CountingIndex<I> {
    /// Count calls forwarded to `inner`.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            nearest_calls: AtomicUsize::new(0),
            within_calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Number of `k_nearest` calls seen.
    pub fn nearest_calls(&self) -> usize {
        self.nearest_calls.load(Ordering::SeqCst)
    }

    /// Number of `within_box` calls seen.
    pub fn within_calls(&self) -> usize {
        self.within_calls.load(Ordering::SeqCst)
    }

    /// Sizes of every batch passed to `upsert_batch`, sorted ascending.
    ///
    /// Batches may complete out of order, so arrival order is not kept.
    pub fn batch_sizes(&self) -> Vec<usize> {
        let mut sizes = self
            .batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default();
        sizes.sort_unstable();
        sizes
    }

    /// The wrapped index.
    pub const fn inner(&self) -> &I {
        &self.inner
    }
}

#[async_trait]
impl<I: PoiIndex> PoiIndex for CountingIndex<I> {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        if let Ok(mut sizes) = self.batch_sizes.lock() {
            sizes.push(records.len());
        }
        self.inner.upsert_batch(records).await
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.k_nearest(point, k).await
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        self.within_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.within_box(bbox).await
    }
}

/// Wrapper that fails any batch containing one of the configured ids.
#[derive(Debug)]
pub struct RejectingIndex<I> {
    inner: I,
    rejected: HashSet<String>,
}

impl<I> RejectingIndex<I> {
    /// Reject batches containing any id from `ids`.
    pub fn new<S>(inner: I, ids: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            inner,
            rejected: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// The wrapped index.
    pub const fn inner(&self) -> &I {
        &self.inner
    }
}

#[async_trait]
impl<I: PoiIndex> PoiIndex for RejectingIndex<I> {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        let failed_ids: Vec<String> = records
            .iter()
            .filter(|record| self.rejected.contains(record.id()))
            .map(|record| record.id().to_owned())
            .collect();
        if failed_ids.is_empty() {
            return self.inner.upsert_batch(records).await;
        }
        Err(StoreError::WriteRejected {
            message: "rejected by test index".into(),
            failed_ids,
        })
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        self.inner.k_nearest(point, k).await
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        self.inner.within_box(bbox).await
    }
}
