//! File-backed entry point for ingestion.

use std::sync::Arc;

use camino::Utf8Path;
use foodpoi_core::PoiIndex;
use log::info;

use crate::ingest::{BatchIngestor, IngestError, IngestOptions, IngestSummary};

/// Load every POI from the export at `path` into `index`.
///
/// The first line is treated as a header. Lines that are not valid UTF-8 are
/// rejected without stopping the load. See [`BatchIngestor`] for how bad
/// lines and failed batches are reported.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use foodpoi_core::MemoryPoiIndex;
/// use foodpoi_data::{IngestOptions, load_pois_from_path};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index = Arc::new(MemoryPoiIndex::default());
/// let summary = load_pois_from_path(
///     index,
///     Utf8Path::new("data/pois.csv"),
///     IngestOptions::default(),
/// )
/// .await?;
/// println!("{} POIs written", summary.records_written);
/// # Ok(())
/// # }
/// ```
pub async fn load_pois_from_path(
    index: Arc<dyn PoiIndex>,
    path: &Utf8Path,
    options: IngestOptions,
) -> Result<IngestSummary, IngestError> {
    let ingestor = BatchIngestor::new(index, options)?;
    let lines = foodpoi_fs::read_byte_lines(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loading POIs from {path}");
    ingestor.ingest_byte_lines(lines).await
}
