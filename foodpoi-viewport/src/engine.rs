//! Actor keeping the detail and overview surfaces in step.
//!
//! The engine owns both viewports and their marker sets. Events arrive over a
//! channel; queries run as separate tasks and report back over a second
//! channel tagged with a per-surface generation, so a result that has been
//! superseded is dropped instead of painted over a newer one.

use std::time::Duration;

use foodpoi_core::{GeoQuery, QueryError, QueryHit, QueryResult, geodesy::normalize};
use geo::{Coord, Rect};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    debounce::{DEFAULT_DEBOUNCE, Debouncer},
    event::{StateError, Surface, ViewportEvent},
    reconcile::{MarkerSet, reconcile},
    sink::{DisplaySink, Marker, MarkerKey},
};

/// Karlsruhe castle, the initial centre of both surfaces.
pub const DEFAULT_CENTER: Coord<f64> = Coord {
    x: 8.404_435,
    y: 49.013_517,
};

/// Initial zoom level of both surfaces.
pub const DEFAULT_ZOOM: f64 = 14.0;

/// Records labelled on the detail surface per point selection.
pub const DEFAULT_NEAREST_K: usize = 5;

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Centre applied when a surface initialises.
    pub default_center: Coord<f64>,
    /// Zoom applied when a surface initialises.
    pub default_zoom: f64,
    /// Records fetched per point selection.
    pub nearest_k: usize,
    /// Quiet window before an overview region query fires.
    pub debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            nearest_k: DEFAULT_NEAREST_K,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl EngineConfig {
    /// Set the initial centre and zoom.
    #[must_use]
    pub const fn with_default_view(mut self, center: Coord<f64>, zoom: f64) -> Self {
        self.default_center = center;
        self.default_zoom = zoom;
        self
    }

    /// Set how many records a point selection labels.
    #[must_use]
    pub const fn with_nearest_k(mut self, k: usize) -> Self {
        self.nearest_k = k;
        self
    }

    /// Set the overview debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Lifecycle of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceState {
    /// Waiting for the surface to report initialisation.
    #[default]
    Uninitialized,
    /// Accepting events.
    Ready,
}

/// Last known position of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Map centre.
    pub center: Coord<f64>,
    /// Zoom level.
    pub zoom: f64,
    /// Visible region, once reported.
    pub extent: Option<Rect<f64>>,
    /// Lifecycle state.
    pub state: SurfaceState,
}

impl Viewport {
    fn new(config: &EngineConfig) -> Self {
        Self {
            center: config.default_center,
            zoom: config.default_zoom,
            extent: None,
            state: SurfaceState::Uninitialized,
        }
    }

    fn shows(&self, center: Coord<f64>, zoom: f64) -> bool {
        self.center == center && self.zoom.total_cmp(&zoom).is_eq()
    }
}

/// The engine task has stopped and no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("viewport sync engine has shut down")]
pub struct EngineClosed;

/// Sender side of a running engine.
#[derive(Debug)]
pub struct ViewportSyncHandle {
    events: UnboundedSender<ViewportEvent>,
    task: JoinHandle<()>,
}

impl ViewportSyncHandle {
    /// Queue `event` for the engine.
    pub fn send(&self, event: ViewportEvent) -> Result<(), EngineClosed> {
        self.events.send(event).map_err(|_| EngineClosed)
    }

    /// Close the event channel and wait for the engine to stop.
    ///
    /// In-flight queries are aborted.
    pub async fn shutdown(self) -> Result<(), EngineClosed> {
        let Self { events, task } = self;
        drop(events);
        task.await.map_err(|err| {
            error!("viewport sync engine ended abnormally: {err}");
            EngineClosed
        })
    }
}

struct Completion {
    surface: Surface,
    generation: u64,
    outcome: Result<QueryResult, QueryError>,
}

struct SurfaceSlot {
    surface: Surface,
    viewport: Viewport,
    sink: Box<dyn DisplaySink>,
    markers: MarkerSet,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl SurfaceSlot {
    fn new(surface: Surface, config: &EngineConfig, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            surface,
            viewport: Viewport::new(config),
            sink,
            markers: MarkerSet::new(),
            generation: 0,
            in_flight: None,
        }
    }

    fn require_ready(&self) -> Result<(), StateError> {
        match self.viewport.state {
            SurfaceState::Ready => Ok(()),
            SurfaceState::Uninitialized => Err(StateError::Uninitialized {
                surface: self.surface,
            }),
        }
    }

    fn move_to(&mut self, center: Coord<f64>, zoom: f64) {
        self.viewport.center = center;
        self.viewport.zoom = zoom;
        self.sink.set_viewport(center, zoom);
    }

    fn show(&mut self, key: MarkerKey, coordinate: Coord<f64>, label: String) {
        if self.markers.contains(&key) {
            self.hide(&key);
        }
        self.sink.add_marker(&key, coordinate, &label);
        self.markers.insert(key, Marker { coordinate, label });
    }

    fn hide(&mut self, key: &MarkerKey) {
        if self.markers.remove(key).is_some() {
            self.sink.remove_marker(key);
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }

    /// Invalidate any result still owed to this surface.
    fn supersede(&mut self) -> u64 {
        self.abort_in_flight();
        self.generation += 1;
        self.generation
    }
}

/// State owned by the engine task.
pub struct ViewportSyncEngine {
    config: EngineConfig,
    query: GeoQuery,
    detail: SurfaceSlot,
    overview: SurfaceSlot,
    debouncer: Debouncer<Rect<f64>>,
    completions: UnboundedSender<Completion>,
}

impl std::fmt::Debug for ViewportSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportSyncEngine")
            .field("config", &self.config)
            .field("detail", &self.detail.viewport)
            .field("overview", &self.overview.viewport)
            .finish_non_exhaustive()
    }
}

impl ViewportSyncEngine {
    /// Start the engine on the current Tokio runtime.
    ///
    /// # Examples
    /// ```no_run
    /// use std::{sync::Arc, time::Duration};
    /// use foodpoi_core::{GeoQuery, MemoryPoiIndex};
    /// use foodpoi_viewport::{DisplaySink, EngineConfig, MarkerKey, Surface, ViewportEvent, ViewportSyncEngine};
    /// use geo::Coord;
    ///
    /// struct Log;
    /// impl DisplaySink for Log {
    ///     fn add_marker(&mut self, key: &MarkerKey, _: Coord<f64>, label: &str) {
    ///         println!("+ {key} {label}");
    ///     }
    ///     fn remove_marker(&mut self, key: &MarkerKey) {
    ///         println!("- {key}");
    ///     }
    ///     fn set_viewport(&mut self, center: Coord<f64>, zoom: f64) {
    ///         println!("view {center:?} @ {zoom}");
    ///     }
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let query = GeoQuery::new(Arc::new(MemoryPoiIndex::default()), Duration::from_secs(5));
    /// let handle = ViewportSyncEngine::spawn(EngineConfig::default(), query, Log, Log);
    /// handle.send(ViewportEvent::Initialized(Surface::Detail))?;
    /// handle.send(ViewportEvent::PointSelected { coordinate: Coord { x: 8.4, y: 49.0 } })?;
    /// handle.shutdown().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn<D, O>(
        config: EngineConfig,
        query: GeoQuery,
        detail: D,
        overview: O,
    ) -> ViewportSyncHandle
    where
        D: DisplaySink + 'static,
        O: DisplaySink + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let engine = Self::new(
            config,
            query,
            Box::new(detail),
            Box::new(overview),
            completions_tx,
        );
        let task = tokio::spawn(engine.run(events_rx, completions_rx));
        ViewportSyncHandle {
            events: events_tx,
            task,
        }
    }

    fn new(
        config: EngineConfig,
        query: GeoQuery,
        detail: Box<dyn DisplaySink>,
        overview: Box<dyn DisplaySink>,
        completions: UnboundedSender<Completion>,
    ) -> Self {
        Self {
            query,
            detail: SurfaceSlot::new(Surface::Detail, &config, detail),
            overview: SurfaceSlot::new(Surface::Overview, &config, overview),
            debouncer: Debouncer::new(config.debounce),
            completions,
            config,
        }
    }

    async fn run(
        mut self,
        mut events: UnboundedReceiver<ViewportEvent>,
        mut completions: UnboundedReceiver<Completion>,
    ) {
        info!("viewport sync engine started");
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },

                Some(done) = completions.recv() => self.complete(done),

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(extent) = self.debouncer.take_due(Instant::now()) {
                        self.query_region(extent);
                    }
                }
            }
        }

        self.debouncer.cancel();
        self.detail.abort_in_flight();
        self.overview.abort_in_flight();
        info!("viewport sync engine stopped");
    }

    fn handle(&mut self, event: ViewportEvent) {
        let surface = event.surface();
        if let Err(err) = self.apply(event) {
            debug!("ignoring {surface} event: {err}");
        }
    }

    fn apply(&mut self, event: ViewportEvent) -> Result<(), StateError> {
        match event {
            ViewportEvent::Initialized(surface) => {
                self.initialise(surface);
                Ok(())
            }
            ViewportEvent::PointSelected { coordinate } => self.select_point(coordinate),
            ViewportEvent::DetailViewportChanged { center, zoom } => {
                self.detail.require_ready()?;
                self.detail.viewport.center = center;
                self.detail.viewport.zoom = zoom;
                self.mirror(Surface::Detail);
                Ok(())
            }
            ViewportEvent::RegionChanged {
                extent,
                center,
                zoom,
            } => {
                self.overview.require_ready()?;
                self.overview.viewport.extent = Some(extent);
                self.overview.viewport.center = center;
                self.overview.viewport.zoom = zoom;
                // Results for the previous region must not land while the
                // new one is still settling.
                self.overview.supersede();
                self.mirror(Surface::Overview);
                self.debouncer.push(extent);
                Ok(())
            }
        }
    }

    fn slot_mut(&mut self, surface: Surface) -> &mut SurfaceSlot {
        match surface {
            Surface::Detail => &mut self.detail,
            Surface::Overview => &mut self.overview,
        }
    }

    fn initialise(&mut self, surface: Surface) {
        let (center, zoom) = (self.config.default_center, self.config.default_zoom);
        let slot = self.slot_mut(surface);
        if slot.viewport.state == SurfaceState::Ready {
            debug!("{surface} surface already initialised");
            return;
        }
        slot.viewport.state = SurfaceState::Ready;
        slot.move_to(center, zoom);
        debug!("{surface} surface ready at {center:?} zoom {zoom}");
    }

    fn select_point(&mut self, coordinate: Coord<f64>) -> Result<(), StateError> {
        self.detail.require_ready()?;
        let point = normalize(coordinate);
        self.detail.show(MarkerKey::Selection, point, String::new());

        let query = self.query.clone();
        let k = self.config.nearest_k;
        self.issue(Surface::Detail, async move { query.nearest(point, k).await });
        Ok(())
    }

    fn query_region(&mut self, extent: Rect<f64>) {
        if self.overview.viewport.state != SurfaceState::Ready {
            return;
        }
        let bbox = clamp_extent(extent);
        let query = self.query.clone();
        self.issue(Surface::Overview, async move { query.within(bbox).await });
    }

    /// Run `request` for `surface`, superseding any query still in flight.
    fn issue<F>(&mut self, surface: Surface, request: F)
    where
        F: std::future::Future<Output = Result<QueryResult, QueryError>> + Send + 'static,
    {
        let completions = self.completions.clone();
        let slot = self.slot_mut(surface);
        let generation = slot.supersede();

        slot.in_flight = Some(tokio::spawn(async move {
            let outcome = request.await;
            // The receiver lives as long as the engine.
            let _ = completions.send(Completion {
                surface,
                generation,
                outcome,
            });
        }));
    }

    fn complete(&mut self, done: Completion) {
        let Completion {
            surface,
            generation,
            outcome,
        } = done;
        let slot = self.slot_mut(surface);
        if generation != slot.generation {
            debug!(
                "discarding stale {surface} result {generation}; latest is {}",
                slot.generation
            );
            return;
        }
        slot.in_flight = None;

        match (surface, outcome) {
            (Surface::Detail, Ok(result)) => self.label_nearest(&result.hits),
            (Surface::Overview, Ok(result)) => self.apply_region(&result.hits),
            (_, Err(err)) => warn!("{surface} query failed, keeping current markers: {err}"),
        }

        if surface == Surface::Detail {
            self.mirror(Surface::Detail);
        }
    }

    fn label_nearest(&mut self, hits: &[QueryHit]) {
        let stale: Vec<MarkerKey> = self
            .detail
            .markers
            .keys()
            .filter(|key| **key != MarkerKey::Selection)
            .cloned()
            .collect();
        for key in &stale {
            self.detail.hide(key);
        }
        for hit in hits {
            self.detail.show(
                MarkerKey::poi(hit.record.id()),
                hit.record.location(),
                nearest_label(hit),
            );
        }
        debug!("labelled {} nearest POIs", hits.len());
    }

    fn apply_region(&mut self, hits: &[QueryHit]) {
        let delta = reconcile(&self.overview.markers, hits);
        if delta.is_empty() {
            return;
        }
        for key in &delta.to_remove {
            self.overview.hide(key);
        }
        for hit in delta.to_add {
            self.overview.show(
                MarkerKey::poi(hit.record.id()),
                hit.record.location(),
                String::new(),
            );
        }
        debug!("overview now shows {} POIs", self.overview.markers.len());
    }

    /// Copy centre and zoom from `from` onto the other surface when they differ.
    fn mirror(&mut self, from: Surface) {
        let (source, target) = match from {
            Surface::Detail => (&self.detail, &mut self.overview),
            Surface::Overview => (&self.overview, &mut self.detail),
        };
        if target.viewport.state != SurfaceState::Ready {
            return;
        }
        let (center, zoom) = (source.viewport.center, source.viewport.zoom);
        if target.viewport.shows(center, zoom) {
            return;
        }
        target.move_to(center, zoom);
    }
}

fn nearest_label(hit: &QueryHit) -> String {
    match hit.distance_km {
        Some(distance) => format!("{distance:.1} km - {}", hit.record.name()),
        None => hit.record.name().to_owned(),
    }
}

fn clamp_extent(extent: Rect<f64>) -> Rect<f64> {
    let clamp = |corner: Coord<f64>| Coord {
        x: corner.x.clamp(-180.0, 180.0),
        y: corner.y.clamp(-90.0, 90.0),
    };
    Rect::new(clamp(extent.min()), clamp(extent.max()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, SinkCommand};
    use foodpoi_core::{MemoryPoiIndex, PoiRecord, StoreError};
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    struct Harness {
        engine: ViewportSyncEngine,
        detail: RecordingSink,
        overview: RecordingSink,
        _completions: UnboundedReceiver<Completion>,
    }

    #[fixture]
    fn harness() -> Harness {
        let detail = RecordingSink::default();
        let overview = RecordingSink::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let query = GeoQuery::new(Arc::new(MemoryPoiIndex::default()), Duration::from_secs(1));
        let mut engine = ViewportSyncEngine::new(
            EngineConfig::default(),
            query,
            Box::new(detail.clone()),
            Box::new(overview.clone()),
            tx,
        );
        engine.handle(ViewportEvent::Initialized(Surface::Detail));
        engine.handle(ViewportEvent::Initialized(Surface::Overview));
        detail.clear();
        overview.clear();
        Harness {
            engine,
            detail,
            overview,
            _completions: rx,
        }
    }

    fn hit(id: &str, name: &str, distance_km: Option<f64>) -> QueryHit {
        QueryHit {
            record: PoiRecord::new(id, 1, name, Coord { x: 8.4, y: 49.0 })
                .expect("valid test coordinate"),
            distance_km,
        }
    }

    fn result(hits: Vec<QueryHit>) -> Result<QueryResult, QueryError> {
        Ok(QueryResult {
            hits,
            truncated: false,
        })
    }

    fn deliver(
        engine: &mut ViewportSyncEngine,
        surface: Surface,
        outcome: Result<QueryResult, QueryError>,
    ) {
        let generation = engine.slot_mut(surface).generation;
        engine.complete(Completion {
            surface,
            generation,
            outcome,
        });
    }

    #[rstest]
    #[case(1.26, "Cafe Roma", "1.3 km - Cafe Roma")]
    #[case(0.04, "Zum Löwen", "0.0 km - Zum Löwen")]
    #[case(12.96, "Imbiss", "13.0 km - Imbiss")]
    fn labels_show_distance_and_name(
        #[case] km: f64,
        #[case] name: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(nearest_label(&hit("a", name, Some(km))), expected);
    }

    #[rstest]
    fn extent_is_clamped_to_valid_ranges() {
        let wide = Rect::new(Coord { x: -200.0, y: -95.0 }, Coord { x: 190.0, y: 91.0 });
        let clamped = clamp_extent(wide);
        assert_eq!(clamped.min(), Coord { x: -180.0, y: -90.0 });
        assert_eq!(clamped.max(), Coord { x: 180.0, y: 90.0 });
    }

    #[rstest]
    fn initialisation_moves_to_default_view_once() {
        let detail = RecordingSink::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let query = GeoQuery::new(Arc::new(MemoryPoiIndex::default()), Duration::from_secs(1));
        let mut engine = ViewportSyncEngine::new(
            EngineConfig::default(),
            query,
            Box::new(detail.clone()),
            Box::new(RecordingSink::default()),
            tx,
        );

        engine.handle(ViewportEvent::Initialized(Surface::Detail));
        engine.handle(ViewportEvent::Initialized(Surface::Detail));

        assert_eq!(
            detail.commands(),
            vec![SinkCommand::SetViewport {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM
            }]
        );
    }

    #[rstest]
    fn nearest_result_replaces_detail_labels(mut harness: Harness) {
        deliver(
            &mut harness.engine,
            Surface::Detail,
            result(vec![hit("a", "A", Some(0.5)), hit("b", "B", Some(1.0))]),
        );
        deliver(
            &mut harness.engine,
            Surface::Detail,
            result(vec![hit("c", "C", Some(0.2))]),
        );

        assert_eq!(harness.detail.labels(), vec!["0.2 km - C".to_owned()]);
    }

    #[rstest]
    fn stale_completion_is_discarded(mut harness: Harness) {
        harness.engine.slot_mut(Surface::Overview).generation = 2;
        harness.engine.complete(Completion {
            surface: Surface::Overview,
            generation: 1,
            outcome: result(vec![hit("old", "Old", None)]),
        });
        assert!(harness.overview.commands().is_empty());
        assert!(harness.engine.overview.markers.is_empty());
    }

    #[rstest]
    fn failed_region_query_keeps_markers(mut harness: Harness) {
        deliver(
            &mut harness.engine,
            Surface::Overview,
            result(vec![hit("a", "A", None), hit("b", "B", None)]),
        );
        harness.overview.clear();

        deliver(
            &mut harness.engine,
            Surface::Overview,
            Err(QueryError::Store(StoreError::unavailable("down"))),
        );

        assert!(harness.overview.commands().is_empty());
        assert_eq!(harness.engine.overview.markers.len(), 2);
    }

    #[rstest]
    fn region_delta_removes_before_adding(mut harness: Harness) {
        deliver(
            &mut harness.engine,
            Surface::Overview,
            result(vec![hit("a", "A", None), hit("b", "B", None)]),
        );
        harness.overview.clear();

        deliver(
            &mut harness.engine,
            Surface::Overview,
            result(vec![hit("b", "B", None), hit("c", "C", None)]),
        );

        let commands = harness.overview.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            SinkCommand::RemoveMarker {
                key: MarkerKey::poi("a")
            }
        );
        assert!(matches!(
            &commands[1],
            SinkCommand::AddMarker { key, label, .. } if *key == MarkerKey::poi("c") && label.is_empty()
        ));
    }

    #[rstest]
    fn region_change_mirrors_only_when_views_differ(mut harness: Harness) {
        let extent = Rect::new(Coord { x: 8.3, y: 48.9 }, Coord { x: 8.5, y: 49.1 });
        harness.engine.handle(ViewportEvent::RegionChanged {
            extent,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        });
        assert!(harness.detail.commands().is_empty());

        let moved = Coord { x: 8.45, y: 49.0 };
        harness.engine.handle(ViewportEvent::RegionChanged {
            extent,
            center: moved,
            zoom: 12.0,
        });
        assert_eq!(
            harness.detail.commands(),
            vec![SinkCommand::SetViewport {
                center: moved,
                zoom: 12.0
            }]
        );
        assert_eq!(harness.engine.overview.viewport.extent, Some(extent));
    }

    #[rstest]
    fn region_change_discards_the_pending_region_result(mut harness: Harness) {
        let west = Rect::new(Coord { x: 8.3, y: 48.9 }, Coord { x: 8.4, y: 49.0 });
        let east = Rect::new(Coord { x: 8.5, y: 48.9 }, Coord { x: 8.6, y: 49.0 });
        harness.engine.handle(ViewportEvent::RegionChanged {
            extent: west,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        });
        let west_generation = harness.engine.overview.generation;

        harness.engine.handle(ViewportEvent::RegionChanged {
            extent: east,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        });
        harness.engine.complete(Completion {
            surface: Surface::Overview,
            generation: west_generation,
            outcome: result(vec![hit("west", "West", None)]),
        });

        assert!(harness.engine.overview.generation > west_generation);
        assert!(harness.overview.commands().is_empty());
        assert!(harness.engine.overview.markers.is_empty());
    }

    #[rstest]
    fn detail_completion_mirrors_onto_overview_even_on_failure(mut harness: Harness) {
        let moved = Coord { x: 8.41, y: 49.02 };
        harness.engine.detail.viewport.center = moved;
        deliver(
            &mut harness.engine,
            Surface::Detail,
            Err(QueryError::Timeout(Duration::from_secs(1))),
        );
        assert_eq!(harness.overview.viewport(), Some((moved, DEFAULT_ZOOM)));
    }

    #[rstest]
    fn events_for_uninitialised_surfaces_are_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let query = GeoQuery::new(Arc::new(MemoryPoiIndex::default()), Duration::from_secs(1));
        let mut engine = ViewportSyncEngine::new(
            EngineConfig::default(),
            query,
            Box::new(RecordingSink::default()),
            Box::new(RecordingSink::default()),
            tx,
        );
        let err = engine
            .apply(ViewportEvent::PointSelected {
                coordinate: Coord { x: 8.4, y: 49.0 },
            })
            .expect_err("detail is not ready");
        assert_eq!(
            err,
            StateError::Uninitialized {
                surface: Surface::Detail
            }
        );
    }
}
