//! `nearest` and `within` commands.

use std::{io::Write, time::Duration};

use camino::Utf8PathBuf;
use clap::Parser;
use foodpoi_core::{DEFAULT_QUERY_TIMEOUT, GeoQuery, QueryResult};
use geo::{Coord, Rect};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::store::StoreConfig;
use crate::{
    ARG_DATABASE, ARG_ELASTICSEARCH_URL, ARG_INDEX, ARG_LATITUDE, ARG_LIMIT, ARG_LONGITUDE,
    ARG_MAX_LATITUDE, ARG_MAX_LONGITUDE, ARG_MIN_LATITUDE, ARG_MIN_LONGITUDE, ARG_TIMEOUT_SECS,
    CliError, ENV_NEAREST_LATITUDE, ENV_NEAREST_LONGITUDE, ENV_WITHIN_MAX_LATITUDE,
    ENV_WITHIN_MAX_LONGITUDE, ENV_WITHIN_MIN_LATITUDE, ENV_WITHIN_MIN_LONGITUDE, write_json,
};

/// Records returned by `nearest` when `--limit` is not given.
pub(crate) const DEFAULT_LIMIT: usize = 5;

/// CLI arguments for the `nearest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "List the POIs closest to a point, nearest first")]
#[ortho_config(prefix = "FOODPOI")]
pub(crate) struct NearestArgs {
    /// Latitude of the query point in degrees.
    #[arg(long = ARG_LATITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) latitude: Option<f64>,
    /// Longitude of the query point in degrees.
    #[arg(long = ARG_LONGITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) longitude: Option<f64>,
    /// Number of POIs to return (default 5).
    #[arg(long = ARG_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    /// Query timeout in seconds (default 60).
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// SQLite database to query (default `foodpoi.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Elasticsearch base URL; selects the Elasticsearch store.
    #[arg(long = ARG_ELASTICSEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) elasticsearch_url: Option<String>,
    /// Elasticsearch index name.
    #[arg(long = ARG_INDEX, value_name = "name")]
    #[serde(default)]
    pub(crate) index: Option<String>,
}

/// CLI arguments for the `within` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "List the POIs inside a bounding box")]
#[ortho_config(prefix = "FOODPOI")]
pub(crate) struct WithinArgs {
    /// Southern edge in degrees.
    #[arg(long = ARG_MIN_LATITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) min_latitude: Option<f64>,
    /// Western edge in degrees.
    #[arg(long = ARG_MIN_LONGITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) min_longitude: Option<f64>,
    /// Northern edge in degrees.
    #[arg(long = ARG_MAX_LATITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) max_latitude: Option<f64>,
    /// Eastern edge in degrees.
    #[arg(long = ARG_MAX_LONGITUDE, value_name = "deg", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) max_longitude: Option<f64>,
    /// Query timeout in seconds (default 60).
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// SQLite database to query (default `foodpoi.db`).
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Elasticsearch base URL; selects the Elasticsearch store.
    #[arg(long = ARG_ELASTICSEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) elasticsearch_url: Option<String>,
    /// Elasticsearch index name.
    #[arg(long = ARG_INDEX, value_name = "name")]
    #[serde(default)]
    pub(crate) index: Option<String>,
}

/// Resolved `nearest` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearestConfig {
    pub(crate) point: Coord<f64>,
    pub(crate) limit: usize,
    pub(crate) timeout: Duration,
    pub(crate) store: StoreConfig,
}

/// Resolved `within` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WithinConfig {
    pub(crate) bbox: Rect<f64>,
    pub(crate) timeout: Duration,
    pub(crate) store: StoreConfig,
}

fn required<T>(value: Option<T>, field: &'static str, env: &'static str) -> Result<T, CliError> {
    value.ok_or(CliError::MissingArgument { field, env })
}

fn timeout_from(secs: Option<u64>) -> Duration {
    secs.map_or(DEFAULT_QUERY_TIMEOUT, Duration::from_secs)
}

impl TryFrom<NearestArgs> for NearestConfig {
    type Error = CliError;

    fn try_from(args: NearestArgs) -> Result<Self, Self::Error> {
        let latitude = required(args.latitude, ARG_LATITUDE, ENV_NEAREST_LATITUDE)?;
        let longitude = required(args.longitude, ARG_LONGITUDE, ENV_NEAREST_LONGITUDE)?;
        Ok(Self {
            point: Coord {
                x: longitude,
                y: latitude,
            },
            limit: args.limit.unwrap_or(DEFAULT_LIMIT),
            timeout: timeout_from(args.timeout_secs),
            store: StoreConfig::resolve(args.database, args.elasticsearch_url, args.index)?,
        })
    }
}

impl TryFrom<WithinArgs> for WithinConfig {
    type Error = CliError;

    fn try_from(args: WithinArgs) -> Result<Self, Self::Error> {
        let min = Coord {
            x: required(args.min_longitude, ARG_MIN_LONGITUDE, ENV_WITHIN_MIN_LONGITUDE)?,
            y: required(args.min_latitude, ARG_MIN_LATITUDE, ENV_WITHIN_MIN_LATITUDE)?,
        };
        let max = Coord {
            x: required(args.max_longitude, ARG_MAX_LONGITUDE, ENV_WITHIN_MAX_LONGITUDE)?,
            y: required(args.max_latitude, ARG_MAX_LATITUDE, ENV_WITHIN_MAX_LATITUDE)?,
        };
        Ok(Self {
            bbox: Rect::new(min, max),
            timeout: timeout_from(args.timeout_secs),
            store: StoreConfig::resolve(args.database, args.elasticsearch_url, args.index)?,
        })
    }
}

/// Machine-readable query output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QueryReport {
    pub(crate) truncated: bool,
    pub(crate) hits: Vec<HitReport>,
}

/// One returned POI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct HitReport {
    pub(crate) id: String,
    pub(crate) category: i32,
    pub(crate) name: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) distance_km: Option<f64>,
}

impl From<QueryResult> for QueryReport {
    fn from(result: QueryResult) -> Self {
        let hits = result
            .hits
            .into_iter()
            .map(|hit| HitReport {
                id: hit.record.id().to_owned(),
                category: hit.record.category(),
                name: hit.record.name().to_owned(),
                latitude: hit.record.latitude(),
                longitude: hit.record.longitude(),
                distance_km: hit.distance_km,
            })
            .collect();
        Self {
            truncated: result.truncated,
            hits,
        }
    }
}

pub(crate) async fn run_nearest(args: NearestArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = NearestConfig::try_from(merged)?;
    run_nearest_with(&config, writer).await
}

pub(crate) async fn run_nearest_with(
    config: &NearestConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let index = config.store.open(false).await?;
    let query = GeoQuery::new(index, config.timeout);
    let result = query.nearest(config.point, config.limit).await?;
    write_json(writer, &QueryReport::from(result))
}

pub(crate) async fn run_within(args: WithinArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = WithinConfig::try_from(merged)?;
    run_within_with(&config, writer).await
}

pub(crate) async fn run_within_with(
    config: &WithinConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let index = config.store.open(false).await?;
    let query = GeoQuery::new(index, config.timeout);
    let result = query.within(config.bbox).await?;
    write_json(writer, &QueryReport::from(result))
}

#[cfg(test)]
pub(crate) fn nearest_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<NearestConfig, CliError> {
    let merged = NearestArgs::merge_from_layers(layers).map_err(CliError::from)?;
    NearestConfig::try_from(merged)
}
