use geo::Coord;
use thiserror::Error;

/// A named location indexed by the store.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude`. Records can
/// only be built through [`PoiRecord::new`], so a record in hand always carries
/// a well-formed location.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use foodpoi_core::PoiRecord;
///
/// # fn main() -> Result<(), foodpoi_core::PoiRecordError> {
/// let poi = PoiRecord::new("poi-42", 3, "Cafe Roma", Coord { x: 8.4, y: 49.0 })?;
/// assert_eq!(poi.id(), "poi-42");
/// assert_eq!(poi.latitude(), 49.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoiRecord {
    id: String,
    category: i32,
    name: String,
    location: Coord<f64>,
}

/// Errors returned by [`PoiRecord::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PoiRecordError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinate ({lat}, {lon}) is not finite")]
    NonFinite {
        /// Supplied latitude.
        lat: f64,
        /// Supplied longitude.
        lon: f64,
    },
    /// Latitude fell outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude fell outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl PoiRecord {
    /// Validate the location and construct a record.
    pub fn new(
        id: impl Into<String>,
        category: i32,
        name: impl Into<String>,
        location: Coord<f64>,
    ) -> Result<Self, PoiRecordError> {
        validate_location(location)?;
        Ok(Self {
            id: id.into(),
            category,
            name: name.into(),
            location,
        })
    }

    /// Externally supplied identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Integer category code.
    pub const fn category(&self) -> i32 {
        self.category
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location with `x = longitude`, `y = latitude`.
    pub const fn location(&self) -> Coord<f64> {
        self.location
    }

    /// Latitude in degrees.
    pub const fn latitude(&self) -> f64 {
        self.location.y
    }

    /// Longitude in degrees.
    pub const fn longitude(&self) -> f64 {
        self.location.x
    }
}

/// Check that a coordinate is finite and inside the WGS84 ranges.
pub fn validate_location(location: Coord<f64>) -> Result<(), PoiRecordError> {
    let Coord { x: lon, y: lat } = location;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(PoiRecordError::NonFinite { lat, lon });
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(PoiRecordError::LatitudeOutOfRange(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(PoiRecordError::LongitudeOutOfRange(lon));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn record_exposes_fields() {
        let poi = PoiRecord::new("a", 7, "Imbiss", Coord { x: 8.4, y: 49.0 }).unwrap();
        assert_eq!(poi.id(), "a");
        assert_eq!(poi.category(), 7);
        assert_eq!(poi.name(), "Imbiss");
        assert_eq!(poi.longitude(), 8.4);
        assert_eq!(poi.latitude(), 49.0);
    }

    #[rstest]
    #[case(Coord { x: 180.0, y: 90.0 })]
    #[case(Coord { x: -180.0, y: -90.0 })]
    #[case(Coord { x: 0.0, y: 0.0 })]
    fn accepts_boundary_coordinates(#[case] location: Coord<f64>) {
        assert!(PoiRecord::new("a", 1, "x", location).is_ok());
    }

    #[rstest]
    #[case(Coord { x: 0.0, y: 90.5 }, PoiRecordError::LatitudeOutOfRange(90.5))]
    #[case(Coord { x: -180.1, y: 0.0 }, PoiRecordError::LongitudeOutOfRange(-180.1))]
    fn rejects_out_of_range(#[case] location: Coord<f64>, #[case] expected: PoiRecordError) {
        assert_eq!(PoiRecord::new("a", 1, "x", location), Err(expected));
    }

    #[rstest]
    #[case(Coord { x: f64::NAN, y: 0.0 })]
    #[case(Coord { x: 0.0, y: f64::INFINITY })]
    fn rejects_non_finite(#[case] location: Coord<f64>) {
        let result = PoiRecord::new("a", 1, "x", location);
        assert!(matches!(result, Err(PoiRecordError::NonFinite { .. })));
    }
}
