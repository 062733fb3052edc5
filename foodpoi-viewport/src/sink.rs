//! Display sink contract and marker identity.

use std::fmt;

use geo::Coord;

/// Stable identity of a displayed marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkerKey {
    /// Marker for the POI with this id.
    Poi(String),
    /// Marker at the last selected point on the detail surface.
    Selection,
}

impl MarkerKey {
    /// Key for the POI with `id`.
    pub fn poi(id: impl Into<String>) -> Self {
        Self::Poi(id.into())
    }
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poi(id) => f.write_str(id),
            Self::Selection => f.write_str("selection"),
        }
    }
}

/// What a displayed marker shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Position on the map.
    pub coordinate: Coord<f64>,
    /// Label text; may be empty.
    pub label: String,
}

/// Rendering surface driven by the engine.
///
/// Implementations forward commands to a map widget. The engine never adds
/// a key that is already displayed without removing it first.
pub trait DisplaySink: Send {
    /// Show a marker.
    fn add_marker(&mut self, key: &MarkerKey, coordinate: Coord<f64>, label: &str);

    /// Remove a previously added marker.
    fn remove_marker(&mut self, key: &MarkerKey);

    /// Move the surface to `center` at `zoom`.
    fn set_viewport(&mut self, center: Coord<f64>, zoom: f64);
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn add_marker(&mut self, key: &MarkerKey, coordinate: Coord<f64>, label: &str) {
        (**self).add_marker(key, coordinate, label);
    }

    fn remove_marker(&mut self, key: &MarkerKey) {
        (**self).remove_marker(key);
    }

    fn set_viewport(&mut self, center: Coord<f64>, zoom: f64) {
        (**self).set_viewport(center, zoom);
    }
}
