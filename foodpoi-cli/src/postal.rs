//! `load-postal` command: replace the postal-code area index from GeoJSON.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use foodpoi_data::{PostalCollection, load_postal_areas_from_path};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_ELASTICSEARCH_URL, ARG_INDEX, ARG_SOURCE, CliError, ENV_LOAD_POSTAL_ELASTICSEARCH_URL,
    ENV_LOAD_POSTAL_SOURCE, require_file, write_json,
};

/// Index name used when `--index` is not given.
pub(crate) const DEFAULT_POSTAL_INDEX: &str = "plz";

/// CLI arguments for the `load-postal` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read postal-code areas from a GeoJSON FeatureCollection whose \
                 features carry a `plz` property and a Polygon or MultiPolygon \
                 geometry, then replace the Elasticsearch postal index with \
                 them. Features that cannot be read are reported and skipped.",
    about = "Replace the postal-code area index from GeoJSON"
)]
#[ortho_config(prefix = "FOODPOI")]
pub(crate) struct LoadPostalArgs {
    /// Path to the GeoJSON file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) source: Option<Utf8PathBuf>,
    /// Elasticsearch base URL.
    #[arg(long = ARG_ELASTICSEARCH_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) elasticsearch_url: Option<String>,
    /// Postal index name (default `plz`).
    #[arg(long = ARG_INDEX, value_name = "name")]
    #[serde(default)]
    pub(crate) index: Option<String>,
}

/// Resolved `load-postal` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadPostalConfig {
    pub(crate) source: Utf8PathBuf,
    pub(crate) base_url: String,
    pub(crate) index: String,
}

impl TryFrom<LoadPostalArgs> for LoadPostalConfig {
    type Error = CliError;

    fn try_from(args: LoadPostalArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE,
            env: ENV_LOAD_POSTAL_SOURCE,
        })?;
        let base_url = args.elasticsearch_url.ok_or(CliError::MissingArgument {
            field: ARG_ELASTICSEARCH_URL,
            env: ENV_LOAD_POSTAL_ELASTICSEARCH_URL,
        })?;
        Ok(Self {
            source,
            base_url,
            index: args
                .index
                .unwrap_or_else(|| DEFAULT_POSTAL_INDEX.to_owned()),
        })
    }
}

/// Machine-readable outcome of a postal load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PostalReport {
    pub(crate) areas_read: usize,
    pub(crate) areas_written: usize,
    pub(crate) rejected: Vec<RejectedFeature>,
}

/// A feature that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RejectedFeature {
    pub(crate) index: usize,
    pub(crate) reason: String,
}

impl PostalReport {
    fn new(collection: &PostalCollection, areas_written: usize) -> Self {
        Self {
            areas_read: collection.areas.len(),
            areas_written,
            rejected: collection
                .rejections
                .iter()
                .map(|rejection| RejectedFeature {
                    index: rejection.index,
                    reason: rejection.reason.to_string(),
                })
                .collect(),
        }
    }
}

pub(crate) async fn run_load_postal(
    args: LoadPostalArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = LoadPostalConfig::try_from(merged)?;
    run_load_postal_with(&config, writer).await
}

/// Read the areas before touching the index so a bad file leaves it intact.
pub(crate) async fn run_load_postal_with(
    config: &LoadPostalConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    require_file(&config.source, ARG_SOURCE)?;
    let collection = load_postal_areas_from_path(&config.source)?;
    let written = replace_postal_index(config, &collection).await?;
    write_json(writer, &PostalReport::new(&collection, written))
}

#[cfg(feature = "store-elasticsearch")]
async fn replace_postal_index(
    config: &LoadPostalConfig,
    collection: &PostalCollection,
) -> Result<usize, CliError> {
    use foodpoi_data::elasticsearch::{ElasticsearchConfig, ElasticsearchPostalIndex};

    let store = ElasticsearchPostalIndex::with_config(
        ElasticsearchConfig::new(config.base_url.as_str()).with_index(config.index.as_str()),
    )?;
    store
        .reset()
        .await
        .map_err(|source| CliError::PrepareIndex {
            index: config.index.clone(),
            source,
        })?;
    store
        .store(&collection.areas)
        .await
        .map_err(|source| CliError::WritePostalAreas {
            index: config.index.clone(),
            source,
        })
}

#[cfg(not(feature = "store-elasticsearch"))]
#[expect(clippy::unused_async, reason = "signature matches the enabled variant")]
async fn replace_postal_index(
    _config: &LoadPostalConfig,
    _collection: &PostalCollection,
) -> Result<usize, CliError> {
    Err(CliError::MissingFeature {
        feature: "store-elasticsearch",
        action: "loading postal areas",
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LoadPostalConfig, CliError> {
    let merged = LoadPostalArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LoadPostalConfig::try_from(merged)
}
