//! HTTP client implementing [`PoiIndex`] against Elasticsearch.

use std::time::Duration;

use async_trait::async_trait;
use foodpoi_core::{BoxHits, PoiIndex, PoiRecord, StoreError};
use geo::{Coord, Rect};
use log::{debug, info};
use reqwest::{Client, Proxy, Response, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use super::config::ElasticsearchConfig;
use super::dto::{BulkResponse, ErrorResponse, PoiDocument, SearchResponse};

/// Error raised when building an [`ElasticsearchPoiIndex`].
#[derive(Debug, Error)]
pub enum ElasticsearchBuildError {
    /// The base URL or index name did not form a valid URL.
    #[error("invalid Elasticsearch URL {url:?}: {source}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The proxy URL was rejected.
    #[error("invalid proxy {proxy:?}: {source}")]
    InvalidProxy {
        /// Offending proxy URL.
        proxy: String,
        /// Source error returned by `reqwest`.
        #[source]
        source: reqwest::Error,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// [`PoiIndex`] backed by an Elasticsearch index.
///
/// Calls are async and run on the caller's runtime.
pub struct ElasticsearchPoiIndex {
    client: Client,
    config: ElasticsearchConfig,
    index_url: Url,
}

impl std::fmt::Debug for ElasticsearchPoiIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchPoiIndex")
            .field("config", &self.config)
            .field("index_url", &self.index_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ElasticsearchPoiIndex {
    /// Connect to the cluster at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ElasticsearchBuildError> {
        Self::with_config(ElasticsearchConfig::new(base_url))
    }

    /// Connect with explicit configuration.
    pub fn with_config(config: ElasticsearchConfig) -> Result<Self, ElasticsearchBuildError> {
        let index_url = build_index_url(&config.base_url, &config.index)?;
        let client = build_client(&config)?;

        Ok(Self {
            client,
            config,
            index_url,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Create the index with a `geo_point` mapping unless it already exists.
    ///
    /// Returns `true` when the index was created by this call. Existing
    /// mappings are never altered.
    pub async fn ensure_index(&self) -> Result<bool, StoreError> {
        let url = self.index_url.as_str();
        let head = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        if head.status().is_success() {
            debug!("index {} already exists", self.config.index);
            return Ok(false);
        }
        if head.status() != StatusCode::NOT_FOUND {
            return Err(StoreError::unavailable(format!(
                "unexpected status {} checking index {}",
                head.status(),
                self.config.index
            )));
        }

        let response = self
            .client
            .put(url)
            .json(&mapping_body())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        check_status(response, url).await?;
        info!("created index {}", self.config.index);
        Ok(true)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.index_url.as_str().trim_end_matches('/'))
    }

    async fn search(&self, body: &Value) -> Result<SearchResponse, StoreError> {
        let url = self.endpoint("_search");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        let response = check_status(response, &url).await?;
        response
            .json()
            .await
            .map_err(|err| StoreError::malformed(format!("search response from {url}: {err}")))
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> StoreError {
        convert_reqwest_error(error, url, self.config.timeout)
    }
}

/// Build an HTTP client honouring the timeout, proxy and user agent.
pub(super) fn build_client(config: &ElasticsearchConfig) -> Result<Client, ElasticsearchBuildError> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.timeout)
        .timeout(config.timeout);
    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|source| ElasticsearchBuildError::InvalidProxy {
            proxy: proxy.clone(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(ElasticsearchBuildError::HttpClient)
}

/// Convert a reqwest error to a [`StoreError`].
pub(super) fn convert_reqwest_error(
    error: &reqwest::Error,
    url: &str,
    timeout: Duration,
) -> StoreError {
    if error.is_timeout() {
        return StoreError::unavailable(format!(
            "request to {url} timed out after {}s",
            timeout.as_secs()
        ));
    }
    StoreError::unavailable(format!("request to {url} failed: {error}"))
}

pub(super) fn build_index_url(base_url: &str, index: &str) -> Result<Url, ElasticsearchBuildError> {
    let raw = format!("{}/{index}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|source| ElasticsearchBuildError::InvalidUrl { url: raw, source })
}

pub(super) async fn check_status(response: Response, url: &str) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(convert_error_status(status, &body, url))
}

fn convert_error_status(status: StatusCode, body: &str, url: &str) -> StoreError {
    let detail = serde_json::from_str::<ErrorResponse>(body).map_or_else(
        |_| body.to_owned(),
        |parsed| match parsed.error.reason {
            Some(reason) => format!("{}: {reason}", parsed.error.kind),
            None => parsed.error.kind,
        },
    );
    let message = format!("{url} returned {status}: {detail}");
    if status.is_client_error() {
        StoreError::InvalidRequest { message }
    } else {
        StoreError::Unavailable { message }
    }
}

fn mapping_body() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "category": { "type": "integer" },
                "name": { "type": "text" },
                "location": { "type": "geo_point" }
            }
        }
    })
}

fn bulk_body(index: &str, records: &[PoiRecord]) -> Result<String, StoreError> {
    let mut body = String::new();
    for record in records {
        let action = json!({ "index": { "_index": index, "_id": record.id() } });
        let document = serde_json::to_string(&PoiDocument::from(record)).map_err(|err| {
            StoreError::write_rejected(format!("encode POI {}: {err}", record.id()))
        })?;
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&document);
        body.push('\n');
    }
    Ok(body)
}

fn nearest_body(point: Coord<f64>, k: usize) -> Value {
    json!({
        "size": k,
        "query": { "match_all": {} },
        "sort": [{
            "_geo_distance": {
                "location": { "lat": point.y, "lon": point.x },
                "order": "asc",
                "unit": "km",
                "distance_type": "arc"
            }
        }]
    })
}

fn within_body(bbox: &Rect<f64>, window: usize) -> Value {
    json!({
        "size": window,
        "track_total_hits": true,
        "query": {
            "bool": {
                "filter": {
                    "geo_bounding_box": {
                        "location": {
                            "top_left": { "lat": bbox.max().y, "lon": bbox.min().x },
                            "bottom_right": { "lat": bbox.min().y, "lon": bbox.max().x }
                        }
                    }
                }
            }
        }
    })
}

pub(super) fn convert_bulk_response(response: BulkResponse) -> Result<(), StoreError> {
    if !response.errors {
        return Ok(());
    }
    let failed_ids: Vec<String> = response
        .items
        .into_iter()
        .filter_map(|item| item.index)
        .filter(|item| item.failed())
        .map(|item| item.id)
        .collect();
    Err(StoreError::WriteRejected {
        message: format!("{} documents rejected by bulk request", failed_ids.len()),
        failed_ids,
    })
}

fn convert_nearest_response(response: SearchResponse) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
    response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let distance = hit
                .sort
                .first()
                .and_then(Value::as_f64)
                .ok_or_else(|| {
                    StoreError::malformed(format!("hit {} has no geo distance", hit.source.id))
                })?;
            let record = document_to_record(hit.source)?;
            Ok((record, distance))
        })
        .collect()
}

fn convert_within_response(response: SearchResponse) -> Result<BoxHits, StoreError> {
    let returned = response.hits.hits.len() as u64;
    let truncated = response
        .hits
        .total
        .as_ref()
        .is_some_and(|total| total.value > returned || total.relation == "gte");
    let records = response
        .hits
        .hits
        .into_iter()
        .map(|hit| document_to_record(hit.source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BoxHits { records, truncated })
}

fn document_to_record(document: PoiDocument) -> Result<PoiRecord, StoreError> {
    let id = document.id.clone();
    PoiRecord::try_from(document)
        .map_err(|err| StoreError::malformed(format!("document {id} has an invalid location: {err}")))
}

#[async_trait]
impl PoiIndex for ElasticsearchPoiIndex {
    async fn upsert_batch(&self, records: &[PoiRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let url = self.endpoint("_bulk");
        let body = bulk_body(&self.config.index, records)?;
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &url))?;
        let response = check_status(response, &url).await?;
        let bulk: BulkResponse = response
            .json()
            .await
            .map_err(|err| StoreError::malformed(format!("bulk response from {url}: {err}")))?;
        convert_bulk_response(bulk)
    }

    async fn k_nearest(
        &self,
        point: Coord<f64>,
        k: usize,
    ) -> Result<Vec<(PoiRecord, f64)>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let response = self.search(&nearest_body(point, k)).await?;
        convert_nearest_response(response)
    }

    async fn within_box(&self, bbox: &Rect<f64>) -> Result<BoxHits, StoreError> {
        let response = self
            .search(&within_body(bbox, self.config.result_window))
            .await?;
        convert_within_response(response)
    }
}
