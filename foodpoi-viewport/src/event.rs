//! Events fed to the viewport sync engine.

use std::fmt;

use geo::{Coord, Rect};
use thiserror::Error;

/// One of the two synchronised map surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Interactive map; point selection issues nearest queries.
    Detail,
    /// Passive map; region changes issue debounced box queries.
    Overview,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detail => f.write_str("detail"),
            Self::Overview => f.write_str("overview"),
        }
    }
}

/// Input reported by a display surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportEvent {
    /// The surface finished initialising and can accept commands.
    Initialized(Surface),
    /// The user picked a point on the detail surface.
    PointSelected {
        /// Clicked position, possibly outside canonical ranges.
        coordinate: Coord<f64>,
    },
    /// The detail surface was panned or zoomed.
    DetailViewportChanged {
        /// New centre.
        center: Coord<f64>,
        /// New zoom level.
        zoom: f64,
    },
    /// The overview surface reports a new visible region.
    RegionChanged {
        /// Visible extent.
        extent: Rect<f64>,
        /// New centre.
        center: Coord<f64>,
        /// New zoom level.
        zoom: f64,
    },
}

impl ViewportEvent {
    /// Surface the event originates from.
    pub const fn surface(&self) -> Surface {
        match self {
            Self::Initialized(surface) => *surface,
            Self::PointSelected { .. } | Self::DetailViewportChanged { .. } => Surface::Detail,
            Self::RegionChanged { .. } => Surface::Overview,
        }
    }
}

/// Event arrived for a surface that cannot handle it yet.
///
/// The engine logs and drops these; callers never see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// The surface has not reported initialisation.
    #[error("{surface} surface is not initialised")]
    Uninitialized {
        /// Surface the event targeted.
        surface: Surface,
    },
}
