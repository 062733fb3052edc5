//! `load` command: stream a POI export into the store.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use foodpoi_data::{IngestOptions, IngestSummary, load_pois_from_path};
use log::warn;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::store::StoreConfig;
use crate::{
    ARG_BATCH_SIZE, ARG_DATABASE, ARG_ELASTICSEARCH_URL, ARG_INDEX, ARG_MAX_IN_FLIGHT, ARG_SOURCE,
    CliError, ENV_LOAD_SOURCE, require_file, write_json,
};

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Load a `|`-delimited POI export (category|id|lat|lon|name) \
                 into a SQLite database or an Elasticsearch index. The first \
                 line is treated as a header; malformed lines are reported \
                 and skipped.",
    about = "Load a POI export into the store"
)]
#[ortho_config(prefix = "FOODPOI")]
pub(crate) struct LoadArgs {
    /// Path to the POI export.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) source: Option<Utf8PathBuf>,
    /// Records written per batch.
    #[arg(long = ARG_BATCH_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) batch_size: Option<usize>,
    /// Batches written concurrently.
    #[arg(long = ARG_MAX_IN_FLIGHT, value_name = "count")]
    #[serde(default)]
    pub(crate) max_in_flight: Option<usize>,
    /// SQLite database to write (default `foodpoi.db`).
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

impl LoadArgs {
    fn into_config(self) -> Result<LoadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadConfig::try_from(merged)
    }
}

/// Resolved `load` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadConfig {
    pub(crate) source: Utf8PathBuf,
    pub(crate) options: IngestOptions,
    pub(crate) store: StoreConfig,
}

impl TryFrom<LoadArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadArgs) -> Result<Self, Self::Error> {
        let source = args.source.ok_or(CliError::MissingArgument {
            field: ARG_SOURCE,
            env: ENV_LOAD_SOURCE,
        })?;
        let mut options = IngestOptions::default();
        if let Some(batch_size) = args.batch_size {
            options = options.with_batch_size(batch_size);
        }
        if let Some(max_in_flight) = args.max_in_flight {
            options = options.with_max_in_flight(max_in_flight);
        }
        let store = StoreConfig::resolve(args.database, args.elasticsearch_url, args.index)?;
        Ok(Self {
            source,
            options,
            store,
        })
    }
}

/// Machine-readable outcome of a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct LoadReport {
    pub(crate) lines_read: u64,
    pub(crate) blank_lines: u64,
    pub(crate) records_written: u64,
    pub(crate) batches_submitted: u64,
    pub(crate) failed_batches: usize,
    pub(crate) records_failed: usize,
    pub(crate) rejected: Vec<RejectedLine>,
}

/// A line the parser refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RejectedLine {
    pub(crate) line_number: u64,
    pub(crate) reason: String,
}

impl From<&IngestSummary> for LoadReport {
    fn from(summary: &IngestSummary) -> Self {
        Self {
            lines_read: summary.lines_read,
            blank_lines: summary.blank_lines,
            records_written: summary.records_written,
            batches_submitted: summary.batches_submitted,
            failed_batches: summary.batch_failures.len(),
            records_failed: summary.records_failed(),
            rejected: summary
                .rejections
                .iter()
                .map(|rejection| RejectedLine {
                    line_number: rejection.line_number,
                    reason: rejection.reason.to_string(),
                })
                .collect(),
        }
    }
}

pub(crate) async fn run_load(args: LoadArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    run_load_with(&config, writer).await
}

pub(crate) async fn run_load_with(
    config: &LoadConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    require_file(&config.source, ARG_SOURCE)?;
    let index = config.store.open(true).await?;
    let summary = load_pois_from_path(index, &config.source, config.options).await?;
    if !summary.batch_failures.is_empty() {
        warn!(
            "{} batches ({} POIs) were not stored",
            summary.batch_failures.len(),
            summary.records_failed()
        );
    }
    write_json(writer, &LoadReport::from(&summary))
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LoadConfig, CliError> {
    let merged = LoadArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LoadConfig::try_from(merged)
}
