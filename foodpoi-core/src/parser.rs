//! Line parser for the `|`-delimited POI export.
//!
//! Each line carries five columns in a fixed order:
//! `category|id|latitude|longitude|name`. Parsing is pure and never panics;
//! malformed input yields a [`ParseError`] describing the first problem found.

use geo::Coord;
use thiserror::Error;

use crate::{PoiRecord, PoiRecordError};

/// Column delimiter used by the export format.
pub const FIELD_DELIMITER: char = '|';

/// Number of columns on every data line.
pub const FIELD_COUNT: usize = 5;

/// Why a line was not turned into a [`PoiRecord`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The line did not split into exactly [`FIELD_COUNT`] columns.
    #[error("wrong field count: expected {FIELD_COUNT}, found {found}")]
    WrongFieldCount {
        /// Number of columns present.
        found: usize,
    },
    /// A numeric column could not be parsed.
    #[error("unparsable field: {field} ({value:?})")]
    UnparsableField {
        /// Column name.
        field: &'static str,
        /// Raw column text.
        value: String,
    },
    /// The coordinates parsed but do not describe a valid location.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] PoiRecordError),
    /// The raw line is not valid UTF-8.
    #[error("invalid UTF-8 after {valid_up_to} bytes")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        valid_up_to: usize,
    },
}

/// Decode a raw source line.
///
/// On failure the line is returned lossily decoded alongside the error, so
/// callers can still report what they saw.
///
/// # Examples
/// ```
/// use foodpoi_core::parser::{ParseError, decode_line};
///
/// assert_eq!(decode_line(b"3|a|49.0|8.4|A".to_vec()), Ok("3|a|49.0|8.4|A".to_owned()));
/// let (lossy, err) = decode_line(b"Caf\xE9".to_vec()).unwrap_err();
/// assert_eq!(lossy, "Caf\u{FFFD}");
/// assert_eq!(err, ParseError::InvalidUtf8 { valid_up_to: 3 });
/// ```
pub fn decode_line(bytes: Vec<u8>) -> Result<String, (String, ParseError)> {
    String::from_utf8(bytes).map_err(|err| {
        let valid_up_to = err.utf8_error().valid_up_to();
        let lossy = String::from_utf8_lossy(err.as_bytes()).into_owned();
        (lossy, ParseError::InvalidUtf8 { valid_up_to })
    })
}

/// Parse one data line into a validated record.
///
/// # Examples
/// ```
/// use foodpoi_core::parser::{ParseError, parse_line};
///
/// let poi = parse_line("3|poi-42|49.0|8.4|Cafe Roma").unwrap();
/// assert_eq!(poi.name(), "Cafe Roma");
///
/// let err = parse_line("3|poi-42|abc|8.4|Cafe Roma").unwrap_err();
/// assert!(matches!(err, ParseError::UnparsableField { field: "latitude", .. }));
/// ```
pub fn parse_line(line: &str) -> Result<PoiRecord, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [category, id, lat, lon, name] = fields.as_slice() else {
        return Err(ParseError::WrongFieldCount {
            found: fields.len(),
        });
    };

    let category = parse_field::<i32>("category", category)?;
    let lat = parse_field::<f64>("latitude", lat)?;
    let lon = parse_field::<f64>("longitude", lon)?;

    Ok(PoiRecord::new(
        *id,
        category,
        *name,
        Coord { x: lon, y: lat },
    )?)
}

fn parse_field<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ParseError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ParseError::UnparsableField {
            field,
            value: raw.to_owned(),
        })
}
