//! Postal-code areas read from a GeoJSON `FeatureCollection`.
//!
//! Each feature carries a polygon or multipolygon geometry and a `plz`
//! property naming the postal-code prefix. The optional `qkm` (square
//! kilometres) and `einwohner` (population) properties are kept when present.
//! A feature that cannot be turned into a [`PostalArea`] is reported in the
//! [`PostalCollection`] and the rest of the collection is still read.

use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use foodpoi_core::{PoiRecordError, validate_location};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Positions a closed linear ring needs at minimum.
const MIN_RING_POSITIONS: usize = 4;

/// One postal-code area.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalArea {
    /// Postal-code prefix, e.g. `"76"`.
    pub code: String,
    /// Outline of the area in longitude/latitude degrees.
    pub area: MultiPolygon<f64>,
    /// Surface in square kilometres.
    pub square_km: Option<f64>,
    /// Number of inhabitants.
    pub population: Option<u64>,
}

/// Reason a single feature was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// The feature did not match the expected shape.
    #[error("malformed feature: {message}")]
    Malformed {
        /// Decoder message.
        message: String,
    },
    /// The `plz` property was missing or empty.
    #[error("feature has no postal code")]
    MissingCode,
    /// The geometry was neither a `Polygon` nor a `MultiPolygon`.
    #[error("geometry is not a Polygon or MultiPolygon")]
    UnsupportedGeometry,
    /// A position had fewer than two ordinates.
    #[error("position {position} of ring {ring} has fewer than two ordinates")]
    ShortPosition {
        /// Zero-based ring index across the whole geometry.
        ring: usize,
        /// Zero-based position index within the ring.
        position: usize,
    },
    /// A ring had too few positions to enclose an area.
    #[error("ring {ring} has {positions} positions; at least 4 are needed")]
    ShortRing {
        /// Zero-based ring index across the whole geometry.
        ring: usize,
        /// Positions found.
        positions: usize,
    },
    /// A position lay outside the WGS84 ranges.
    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PoiRecordError),
}

/// A feature that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRejection {
    /// Zero-based index of the feature in the collection.
    pub index: usize,
    /// Why it was skipped.
    pub reason: FeatureError,
}

/// Areas read from one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostalCollection {
    /// Areas in collection order.
    pub areas: Vec<PostalArea>,
    /// Features that were skipped.
    pub rejections: Vec<FeatureRejection>,
}

/// Error that stops reading a collection.
#[derive(Debug, Error)]
pub enum PostalError {
    /// The file could not be opened.
    #[error("failed to open postal areas at {path}")]
    Open {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The document was not valid JSON.
    #[error("postal areas are not valid JSON")]
    Decode(#[source] serde_json::Error),
    /// The document was JSON but not a `FeatureCollection`.
    #[error("expected a FeatureCollection, found {kind:?}")]
    NotACollection {
        /// The `type` member that was found.
        kind: String,
    },
}

#[derive(Debug, Deserialize)]
struct CollectionDto {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FeatureDto {
    geometry: GeometryDto,
    #[serde(default)]
    properties: Option<PropertiesDto>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeometryDto {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct PropertiesDto {
    plz: Option<String>,
    qkm: Option<f64>,
    einwohner: Option<u64>,
}

/// Read every postal area from a GeoJSON `FeatureCollection`.
///
/// # Examples
/// ```
/// use foodpoi_data::postal::parse_postal_areas;
///
/// let geojson = r#"{"type": "FeatureCollection", "features": [{
///     "type": "Feature",
///     "properties": {"plz": "76", "qkm": 1234.5, "einwohner": 500000},
///     "geometry": {"type": "Polygon", "coordinates": [[
///         [8.3, 48.9], [8.5, 48.9], [8.5, 49.1], [8.3, 49.1], [8.3, 48.9]
///     ]]}
/// }]}"#;
/// let collection = parse_postal_areas(geojson.as_bytes())?;
/// assert_eq!(collection.areas[0].code, "76");
/// assert_eq!(collection.areas[0].population, Some(500_000));
/// # Ok::<(), foodpoi_data::postal::PostalError>(())
/// ```
pub fn parse_postal_areas<R: Read>(reader: R) -> Result<PostalCollection, PostalError> {
    let collection: CollectionDto =
        serde_json::from_reader(reader).map_err(PostalError::Decode)?;
    if collection.kind != "FeatureCollection" {
        return Err(PostalError::NotACollection {
            kind: collection.kind,
        });
    }

    let mut parsed = PostalCollection::default();
    for (index, feature) in collection.features.into_iter().enumerate() {
        match postal_area(feature) {
            Ok(area) => parsed.areas.push(area),
            Err(reason) => {
                warn!("skipping postal feature {index}: {reason}");
                parsed.rejections.push(FeatureRejection { index, reason });
            }
        }
    }
    Ok(parsed)
}

/// Read every postal area from the GeoJSON file at `path`.
pub fn load_postal_areas_from_path(path: &Utf8Path) -> Result<PostalCollection, PostalError> {
    let file = foodpoi_fs::open_utf8_file(path).map_err(|source| PostalError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let collection = parse_postal_areas(BufReader::new(file))?;
    info!(
        "read {} postal areas from {path} ({} skipped)",
        collection.areas.len(),
        collection.rejections.len()
    );
    Ok(collection)
}

fn postal_area(feature: Value) -> Result<PostalArea, FeatureError> {
    let FeatureDto {
        geometry,
        properties,
    } = serde_json::from_value(feature).map_err(|err| FeatureError::Malformed {
        message: err.to_string(),
    })?;
    let properties = properties.unwrap_or_default();
    let code = properties
        .plz
        .filter(|code| !code.trim().is_empty())
        .ok_or(FeatureError::MissingCode)?;

    let polygons = match geometry {
        GeometryDto::Polygon { coordinates } => vec![coordinates],
        GeometryDto::MultiPolygon { coordinates } => coordinates,
        GeometryDto::Other => return Err(FeatureError::UnsupportedGeometry),
    };
    let mut rings_seen = 0;
    let area = polygons
        .into_iter()
        .map(|rings| polygon(rings, &mut rings_seen))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostalArea {
        code,
        area: MultiPolygon::new(area),
        square_km: properties.qkm,
        population: properties.einwohner,
    })
}

fn polygon(rings: Vec<Vec<Vec<f64>>>, rings_seen: &mut usize) -> Result<Polygon<f64>, FeatureError> {
    let mut converted = rings
        .into_iter()
        .map(|positions| {
            let ring = *rings_seen;
            *rings_seen += 1;
            line_string(ring, positions)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if converted.is_empty() {
        return Err(FeatureError::ShortRing {
            ring: *rings_seen,
            positions: 0,
        });
    }
    let exterior = converted.remove(0);
    Ok(Polygon::new(exterior, converted))
}

fn line_string(ring: usize, positions: Vec<Vec<f64>>) -> Result<LineString<f64>, FeatureError> {
    if positions.len() < MIN_RING_POSITIONS {
        return Err(FeatureError::ShortRing {
            ring,
            positions: positions.len(),
        });
    }
    let coords = positions
        .into_iter()
        .enumerate()
        .map(|(position, ordinates)| match ordinates.as_slice() {
            [lon, lat, ..] => {
                let coord = Coord { x: *lon, y: *lat };
                validate_location(coord)?;
                Ok(coord)
            }
            _ => Err(FeatureError::ShortPosition { ring, position }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    const SQUARE: &str = "[[8.3, 48.9], [8.5, 48.9], [8.5, 49.1], [8.3, 49.1], [8.3, 48.9]]";

    fn feature(properties: &str, geometry: &str) -> String {
        format!(r#"{{"type": "Feature", "properties": {properties}, "geometry": {geometry}}}"#)
    }

    fn collection(features: &[String]) -> String {
        format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        )
    }

    fn parse(json: &str) -> PostalCollection {
        parse_postal_areas(json.as_bytes()).expect("valid collection")
    }

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    #[rstest]
    fn polygon_feature_becomes_an_area() {
        let json = collection(&[feature(
            r#"{"plz": "76", "qkm": 1234.5, "einwohner": 512000}"#,
            &format!(r#"{{"type": "Polygon", "coordinates": [{SQUARE}]}}"#),
        )]);
        let parsed = parse(&json);

        assert!(parsed.rejections.is_empty());
        let [area] = parsed.areas.as_slice() else {
            panic!("expected one area, got {:?}", parsed.areas);
        };
        assert_eq!(area.code, "76");
        assert_eq!(area.square_km, Some(1234.5));
        assert_eq!(area.population, Some(512_000));
        assert_eq!(area.area.0.len(), 1);
        assert_eq!(area.area.0[0].exterior().0.len(), 5);
        assert_eq!(area.area.0[0].exterior().0[1], Coord { x: 8.5, y: 48.9 });
    }

    #[rstest]
    fn multipolygon_keeps_every_part_and_hole() {
        let hole = "[[8.35, 48.95], [8.45, 48.95], [8.45, 49.05], [8.35, 48.95]]";
        let json = collection(&[feature(
            r#"{"plz": "69"}"#,
            &format!(
                r#"{{"type": "MultiPolygon", "coordinates": [[{SQUARE}, {hole}], [{SQUARE}]]}}"#
            ),
        )]);
        let parsed = parse(&json);

        let area = &parsed.areas[0];
        assert_eq!(area.area.0.len(), 2);
        assert_eq!(area.area.0[0].interiors().len(), 1);
        assert_eq!(area.square_km, None);
        assert_eq!(area.population, None);
    }

    #[rstest]
    #[case::no_code(r#"{"qkm": 1.0}"#, r#"{"type": "Polygon", "coordinates": [SQ]}"#, FeatureError::MissingCode)]
    #[case::blank_code(r#"{"plz": " "}"#, r#"{"type": "Polygon", "coordinates": [SQ]}"#, FeatureError::MissingCode)]
    #[case::point(r#"{"plz": "10"}"#, r#"{"type": "Point", "coordinates": [8.4, 49.0]}"#, FeatureError::UnsupportedGeometry)]
    #[case::short_ring(
        r#"{"plz": "10"}"#,
        r#"{"type": "Polygon", "coordinates": [[[8.3, 48.9], [8.5, 48.9], [8.3, 48.9]]]}"#,
        FeatureError::ShortRing { ring: 0, positions: 3 }
    )]
    #[case::short_position(
        r#"{"plz": "10"}"#,
        r#"{"type": "Polygon", "coordinates": [[[8.3, 48.9], [8.5], [8.5, 49.1], [8.3, 48.9]]]}"#,
        FeatureError::ShortPosition { ring: 0, position: 1 }
    )]
    #[case::latitude(
        r#"{"plz": "10"}"#,
        r#"{"type": "Polygon", "coordinates": [[[8.3, 48.9], [8.5, 98.9], [8.5, 49.1], [8.3, 48.9]]]}"#,
        FeatureError::InvalidPosition(PoiRecordError::LatitudeOutOfRange(98.9))
    )]
    fn bad_features_are_rejected(
        #[case] properties: &str,
        #[case] geometry: &str,
        #[case] expected: FeatureError,
    ) {
        let bad = feature(properties, &geometry.replace("SQ", SQUARE));
        let good = feature(
            r#"{"plz": "76"}"#,
            &format!(r#"{{"type": "Polygon", "coordinates": [{SQUARE}]}}"#),
        );
        let parsed = parse(&collection(&[bad, good]));

        assert_eq!(parsed.areas.len(), 1);
        assert_eq!(parsed.areas[0].code, "76");
        assert_eq!(
            parsed.rejections,
            vec![FeatureRejection {
                index: 0,
                reason: expected
            }]
        );
    }

    #[rstest]
    fn feature_without_geometry_is_malformed() {
        let parsed = parse(r#"{"type": "FeatureCollection", "features": [{"type": "Feature", "properties": {"plz": "10"}}]}"#);
        assert!(parsed.areas.is_empty());
        assert!(matches!(
            parsed.rejections[0].reason,
            FeatureError::Malformed { .. }
        ));
    }

    #[rstest]
    fn other_document_types_are_refused() {
        let err = parse_postal_areas(r#"{"type": "Feature", "features": []}"#.as_bytes())
            .expect_err("not a collection");
        assert!(matches!(err, PostalError::NotACollection { kind } if kind == "Feature"));
    }

    #[rstest]
    fn invalid_json_is_a_decode_error() {
        let err = parse_postal_areas("{not json".as_bytes()).expect_err("invalid JSON");
        assert!(matches!(err, PostalError::Decode(_)));
    }

    #[rstest]
    fn loads_collection_from_file(temp_dir: TempDir) {
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("plz.geojson"))
            .expect("UTF-8 temp path");
        let json = collection(&[feature(
            r#"{"plz": "76"}"#,
            &format!(r#"{{"type": "Polygon", "coordinates": [{SQUARE}]}}"#),
        )]);
        fs::write(&path, json).expect("write fixture");

        let parsed = load_postal_areas_from_path(&path).expect("load");
        assert_eq!(parsed.areas.len(), 1);
    }

    #[rstest]
    fn missing_file_is_an_open_error(temp_dir: TempDir) {
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("missing.geojson"))
            .expect("UTF-8 temp path");
        let err = load_postal_areas_from_path(&path).expect_err("missing file");
        assert!(matches!(err, PostalError::Open { .. }));
    }
}
