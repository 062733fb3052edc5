//! Wire types for the Elasticsearch document, bulk and search APIs.

use foodpoi_core::{PoiRecord, PoiRecordError};
use geo::Coord;
use serde::{Deserialize, Serialize};

/// `geo_point` in object form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Stored document source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiDocument {
    pub id: String,
    pub category: i32,
    pub name: String,
    pub location: GeoPoint,
}

impl From<&PoiRecord> for PoiDocument {
    fn from(record: &PoiRecord) -> Self {
        Self {
            id: record.id().to_owned(),
            category: record.category(),
            name: record.name().to_owned(),
            location: GeoPoint {
                lat: record.latitude(),
                lon: record.longitude(),
            },
        }
    }
}

impl TryFrom<PoiDocument> for PoiRecord {
    type Error = PoiRecordError;

    fn try_from(document: PoiDocument) -> Result<Self, Self::Error> {
        Self::new(
            document.id,
            document.category,
            document.name,
            Coord {
                x: document.location.lon,
                y: document.location.lat,
            },
        )
    }
}

/// Stored postal-area document source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostalDocument {
    pub plz: String,
    /// GeoJSON geometry for the `geo_shape` field.
    pub geometry: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qkm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub einwohner: Option<u64>,
}

/// `_bulk` response body.
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    /// Set when at least one item failed.
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// One `_bulk` item, keyed by the action that produced it.
#[derive(Debug, Deserialize)]
pub struct BulkItem {
    pub index: Option<BulkItemResult>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: u16,
    pub error: Option<serde_json::Value>,
}

impl BulkItemResult {
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.status >= 300
    }
}

/// `_search` response body.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    /// `"eq"` for exact totals, `"gte"` for lower bounds.
    pub relation: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_source")]
    pub source: PoiDocument,
    /// Sort values; the first is the geo distance for nearest queries.
    #[serde(default)]
    pub sort: Vec<serde_json::Value>,
}

/// Structured error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCause,
}

#[derive(Debug, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialise_bulk_response_with_failure() {
        let json = r#"{
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "foodpoi", "_id": "a", "status": 201}},
                {"index": {"_index": "foodpoi", "_id": "b", "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "bad point"}}}
            ]
        }"#;

        let response: BulkResponse = serde_json::from_str(json).expect("should deserialise");

        assert!(response.errors);
        let failed: Vec<&str> = response
            .items
            .iter()
            .filter_map(|item| item.index.as_ref())
            .filter(|item| item.failed())
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(failed, vec!["b"]);
    }

    #[test]
    fn deserialise_search_response() {
        let json = r#"{
            "hits": {
                "total": {"value": 12, "relation": "eq"},
                "hits": [
                    {"_id": "poi-42", "_source": {"id": "poi-42", "category": 3,
                        "name": "Cafe Roma", "location": {"lat": 49.0, "lon": 8.4}},
                     "sort": [1.25]}
                ]
            }
        }"#;

        let response: SearchResponse = serde_json::from_str(json).expect("should deserialise");

        let total = response.hits.total.expect("total present");
        assert_eq!((total.value, total.relation.as_str()), (12, "eq"));
        let hit = &response.hits.hits[0];
        assert_eq!(hit.source.name, "Cafe Roma");
        assert_eq!(hit.sort[0].as_f64(), Some(1.25));
    }

    #[test]
    fn document_round_trips_through_record() {
        let record = PoiRecord::new("a", 2, "Imbiss", Coord { x: 8.4, y: 49.0 })
            .expect("valid record");
        let document = PoiDocument::from(&record);
        assert_eq!(document.location, GeoPoint { lat: 49.0, lon: 8.4 });
        assert_eq!(PoiRecord::try_from(document), Ok(record));
    }
}
