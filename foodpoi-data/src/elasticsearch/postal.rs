//! Elasticsearch index of postal-code areas stored as `geo_shape` documents.

use geo::{LineString, MultiPolygon, Polygon};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use url::Url;

use foodpoi_core::StoreError;

use super::config::ElasticsearchConfig;
use super::dto::{BulkResponse, PostalDocument};
use super::provider::{
    ElasticsearchBuildError, build_client, build_index_url, check_status, convert_bulk_response,
    convert_reqwest_error,
};
use crate::postal::PostalArea;

/// Areas sent per `_bulk` request; outlines can be large.
const BULK_CHUNK: usize = 25;

/// Postal-code areas held in one Elasticsearch index.
///
/// Documents are keyed by postal code, so storing an area twice replaces it.
pub struct ElasticsearchPostalIndex {
    client: Client,
    config: ElasticsearchConfig,
    index_url: Url,
}

impl std::fmt::Debug for ElasticsearchPostalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchPostalIndex")
            .field("config", &self.config)
            .field("index_url", &self.index_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ElasticsearchPostalIndex {
    /// Connect with explicit configuration.
    ///
    /// `config.index` names the postal index, usually
    /// [`super::DEFAULT_POSTAL_INDEX_NAME`].
    pub fn with_config(config: ElasticsearchConfig) -> Result<Self, ElasticsearchBuildError> {
        let index_url = build_index_url(&config.base_url, &config.index)?;
        let client = build_client(&config)?;
        Ok(Self {
            client,
            config,
            index_url,
        })
    }

    /// Drop the index if it exists and create it empty with a `geo_shape`
    /// mapping.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let url = self.index_url.as_str();
        let deleted = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url, self.config.timeout))?;
        if deleted.status() == StatusCode::NOT_FOUND {
            debug!("index {} did not exist", self.config.index);
        } else {
            check_status(deleted, url).await?;
            debug!("deleted index {}", self.config.index);
        }

        let created = self
            .client
            .put(url)
            .json(&postal_mapping_body())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url, self.config.timeout))?;
        check_status(created, url).await?;
        info!("created postal index {}", self.config.index);
        Ok(())
    }

    /// Write `areas` in bulk requests.
    ///
    /// Stops at the first request that fails; earlier chunks stay written.
    pub async fn store(&self, areas: &[PostalArea]) -> Result<usize, StoreError> {
        let url = format!("{}/_bulk", self.index_url.as_str().trim_end_matches('/'));
        let mut written = 0;
        for chunk in areas.chunks(BULK_CHUNK) {
            let body = postal_bulk_body(&self.config.index, chunk)?;
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(body)
                .send()
                .await
                .map_err(|err| convert_reqwest_error(&err, &url, self.config.timeout))?;
            let response = check_status(response, &url).await?;
            let bulk: BulkResponse = response
                .json()
                .await
                .map_err(|err| StoreError::malformed(format!("bulk response from {url}: {err}")))?;
            convert_bulk_response(bulk)?;
            written += chunk.len();
            debug!("stored {written} of {} postal areas", areas.len());
        }
        info!("stored {written} postal areas in {}", self.config.index);
        Ok(written)
    }
}

fn postal_mapping_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                "plz": { "type": "keyword" },
                "geometry": { "type": "geo_shape" },
                "qkm": { "type": "double" },
                "einwohner": { "type": "long" }
            }
        }
    })
}

fn postal_bulk_body(index: &str, areas: &[PostalArea]) -> Result<String, StoreError> {
    let mut body = String::new();
    for area in areas {
        let action = json!({ "index": { "_index": index, "_id": area.code } });
        let document = serde_json::to_string(&PostalDocument::from(area)).map_err(|err| {
            StoreError::write_rejected(format!("encode postal area {}: {err}", area.code))
        })?;
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&document);
        body.push('\n');
    }
    Ok(body)
}

impl From<&PostalArea> for PostalDocument {
    fn from(area: &PostalArea) -> Self {
        Self {
            plz: area.code.clone(),
            geometry: geometry_json(&area.area),
            qkm: area.square_km,
            einwohner: area.population,
        }
    }
}

/// GeoJSON geometry for `area`; a single part is written as a `Polygon`.
fn geometry_json(area: &MultiPolygon<f64>) -> Value {
    match area.0.as_slice() {
        [single] => json!({ "type": "Polygon", "coordinates": polygon_json(single) }),
        parts => json!({
            "type": "MultiPolygon",
            "coordinates": parts.iter().map(polygon_json).collect::<Vec<_>>()
        }),
    }
}

fn polygon_json(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_json)
        .collect()
}

fn ring_json(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|coord| [coord.x, coord.y]).collect()
}
