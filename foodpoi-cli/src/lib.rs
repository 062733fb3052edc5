//! Command-line interface for loading and querying FoodPOI data.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use serde::Serialize;

mod error;
mod load;
mod postal;
mod query;
mod store;

pub use error::CliError;

use load::LoadArgs;
use postal::LoadPostalArgs;
use query::{NearestArgs, WithinArgs};

const ARG_SOURCE: &str = "source";
const ARG_BATCH_SIZE: &str = "batch-size";
const ARG_MAX_IN_FLIGHT: &str = "max-in-flight";
const ARG_DATABASE: &str = "database";
const ARG_ELASTICSEARCH_URL: &str = "elasticsearch-url";
const ARG_INDEX: &str = "index";
const ARG_LATITUDE: &str = "latitude";
const ARG_LONGITUDE: &str = "longitude";
const ARG_LIMIT: &str = "limit";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_MIN_LATITUDE: &str = "min-latitude";
const ARG_MIN_LONGITUDE: &str = "min-longitude";
const ARG_MAX_LATITUDE: &str = "max-latitude";
const ARG_MAX_LONGITUDE: &str = "max-longitude";
const ENV_LOAD_SOURCE: &str = "FOODPOI_CMDS_LOAD_SOURCE";
const ENV_LOAD_POSTAL_SOURCE: &str = "FOODPOI_CMDS_LOAD_POSTAL_SOURCE";
const ENV_LOAD_POSTAL_ELASTICSEARCH_URL: &str = "FOODPOI_CMDS_LOAD_POSTAL_ELASTICSEARCH_URL";
const ENV_NEAREST_LATITUDE: &str = "FOODPOI_CMDS_NEAREST_LATITUDE";
const ENV_NEAREST_LONGITUDE: &str = "FOODPOI_CMDS_NEAREST_LONGITUDE";
const ENV_WITHIN_MIN_LATITUDE: &str = "FOODPOI_CMDS_WITHIN_MIN_LATITUDE";
const ENV_WITHIN_MIN_LONGITUDE: &str = "FOODPOI_CMDS_WITHIN_MIN_LONGITUDE";
const ENV_WITHIN_MAX_LATITUDE: &str = "FOODPOI_CMDS_WITHIN_MAX_LATITUDE";
const ENV_WITHIN_MAX_LONGITUDE: &str = "FOODPOI_CMDS_WITHIN_MAX_LONGITUDE";

/// Run the FoodPOI CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(dispatch(cli.command, &mut stdout))
}

async fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Load(args) => load::run_load(args, writer).await,
        Command::LoadPostal(args) => postal::run_load_postal(args, writer).await,
        Command::Nearest(args) => query::run_nearest(args, writer).await,
        Command::Within(args) => query::run_within(args, writer).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "foodpoi",
    about = "Load food POI exports and query them by location",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a `|`-delimited POI export into the store.
    Load(LoadArgs),
    /// Replace the postal-code area index from a GeoJSON file.
    LoadPostal(LoadPostalArgs),
    /// List the POIs closest to a point.
    Nearest(NearestArgs),
    /// List the POIs inside a bounding box.
    Within(WithinArgs),
}

/// Fail unless `path` is an existing regular file.
fn require_file(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match foodpoi_fs::is_regular_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `report` as pretty JSON followed by a newline.
fn write_json<T: Serialize>(writer: &mut dyn Write, report: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
