//! Dual-viewport synchronisation for the FoodPOI map.
//!
//! A [`ViewportSyncEngine`] keeps a detail and an overview surface at the same
//! centre and zoom, labels the POIs nearest to a selected point on the detail
//! surface and shows every POI inside the overview's visible region. Display
//! surfaces are reached only through the [`DisplaySink`] trait, so the engine
//! runs the same against a map widget or a test recorder.

mod debounce;
pub mod engine;
mod event;
mod reconcile;
mod sink;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use engine::{
    DEFAULT_CENTER, DEFAULT_NEAREST_K, DEFAULT_ZOOM, EngineClosed, EngineConfig, SurfaceState,
    Viewport, ViewportSyncEngine, ViewportSyncHandle,
};
pub use event::{StateError, Surface, ViewportEvent};
pub use reconcile::{MarkerDelta, MarkerSet, reconcile};
pub use sink::{DisplaySink, Marker, MarkerKey};
