//! Streaming ingestion of `|`-delimited POI exports.
//!
//! [`BatchIngestor`] reads lines, parses each with
//! [`foodpoi_core::parse_line`], cuts fixed-size batches and writes them to a
//! shared [`PoiIndex`] with a bounded number of writes in flight. Bad lines,
//! including lines that are not valid UTF-8, and failed batches are recorded in
//! the [`IngestSummary`]; only a failure to read the source stops the run.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use camino::Utf8PathBuf;
use foodpoi_core::{ParseError, PoiIndex, PoiRecord, StoreError, decode_line, parse_line};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinHandle};

mod batch;

pub use batch::{Batch, BatchAccumulator};

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of batch writes allowed in flight.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Tuning for a [`BatchIngestor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Records per batch; must be positive.
    pub batch_size: usize,
    /// Concurrent batch writes; must be positive.
    ///
    /// With more than one write in flight, batches may complete out of
    /// order. When an id appears in two batches the surviving record is the
    /// one whose batch finished last, not necessarily the later line. Use
    /// `1` when the source repeats ids and the last line must win.
    pub max_in_flight: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl IngestOptions {
    /// Set the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the number of concurrent batch writes.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    fn validate(self) -> Result<Self, IngestError> {
        if self.batch_size == 0 {
            return Err(IngestError::InvalidOptions {
                message: "batch size must be greater than zero".into(),
            });
        }
        if self.max_in_flight == 0 {
            return Err(IngestError::InvalidOptions {
                message: "max in-flight batches must be greater than zero".into(),
            });
        }
        Ok(self)
    }
}

/// A line the parser refused.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRejection {
    /// One-based line number in the source, header included.
    pub line_number: u64,
    /// Raw line text, lossily decoded when it was not valid UTF-8.
    pub line: String,
    /// Why the parser refused it.
    pub reason: ParseError,
}

/// Why a batch was not written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchWriteError {
    /// The index rejected the batch.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The writer task ended without reporting a result.
    #[error("batch writer aborted: {message}")]
    Aborted {
        /// Runtime description of the abort.
        message: String,
    },
}

/// A batch the index did not accept.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Position of the batch in stream order.
    pub sequence: u64,
    /// Records carried by the batch; empty when the writer task aborted.
    pub records: Vec<PoiRecord>,
    /// Failure reported for the whole batch.
    pub error: BatchWriteError,
}

/// Live counters shared with running batch writers.
#[derive(Debug, Default)]
pub struct IngestProgress {
    written: AtomicU64,
    batches_completed: AtomicU64,
}

impl IngestProgress {
    /// Records acknowledged by the index so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    /// Batches that have finished, successfully or not.
    pub fn batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::Acquire)
    }

    fn record_written(&self, count: u64) -> u64 {
        self.written.fetch_add(count, Ordering::AcqRel) + count
    }

    fn record_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Lines read after the header.
    pub lines_read: u64,
    /// Blank or whitespace-only lines skipped without parsing.
    pub blank_lines: u64,
    /// Lines the parser refused.
    pub rejections: Vec<LineRejection>,
    /// Records acknowledged by the index.
    pub records_written: u64,
    /// Batches handed to the index.
    pub batches_submitted: u64,
    /// Batches the index did not accept.
    pub batch_failures: Vec<BatchFailure>,
}

impl IngestSummary {
    /// Number of parser rejections.
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    /// Records lost to failed batches.
    pub fn records_failed(&self) -> usize {
        self.batch_failures
            .iter()
            .map(|failure| failure.records.len())
            .sum()
    }
}

/// Errors that stop an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source file could not be opened.
    #[error("failed to open POI source at {path}")]
    Open {
        /// Location of the source file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Reading a line from the source failed.
    ///
    /// Records parsed before the failure are still written; `partial`
    /// describes what happened up to that point.
    #[error("failed to read POI source at line {line_number}")]
    Read {
        /// One-based line number that could not be read.
        line_number: u64,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
        /// Outcome of the lines read before the failure.
        partial: Box<IngestSummary>,
    },
    /// The ingestion options were rejected.
    #[error("invalid ingest options: {message}")]
    InvalidOptions {
        /// What was wrong with the options.
        message: String,
    },
}

struct PendingBatch {
    sequence: u64,
    handle: JoinHandle<Result<(), BatchFailure>>,
}

/// Streams parsed records into a [`PoiIndex`] in fixed-size batches.
///
/// # Examples
/// ```
/// use std::{io, sync::Arc};
/// use foodpoi_core::MemoryPoiIndex;
/// use foodpoi_data::ingest::{BatchIngestor, IngestOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index = Arc::new(MemoryPoiIndex::default());
/// let ingestor = BatchIngestor::new(index.clone(), IngestOptions::default())?;
/// let lines = ["cat|id|lat|lon|name", "3|poi-42|49.0|8.4|Cafe Roma", "x|bad|0|0|Nope"]
///     .into_iter()
///     .map(|line| Ok::<_, io::Error>(line.to_owned()));
///
/// let summary = ingestor.ingest_lines(lines).await?;
/// assert_eq!(summary.records_written, 1);
/// assert_eq!(summary.rejected(), 1);
/// assert_eq!(index.len()?, 1);
/// # Ok(())
/// # }
/// ```
pub struct BatchIngestor {
    index: Arc<dyn PoiIndex>,
    options: IngestOptions,
    progress: Arc<IngestProgress>,
}

impl std::fmt::Debug for BatchIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchIngestor")
            .field("options", &self.options)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl BatchIngestor {
    /// Validate `options` and build an ingestor writing to `index`.
    pub fn new(index: Arc<dyn PoiIndex>, options: IngestOptions) -> Result<Self, IngestError> {
        Ok(Self {
            index,
            options: options.validate()?,
            progress: Arc::new(IngestProgress::default()),
        })
    }

    /// Counters updated while a run is in progress.
    pub fn progress(&self) -> Arc<IngestProgress> {
        Arc::clone(&self.progress)
    }

    /// Consume `lines`, skipping the first as a header.
    ///
    /// Lines are pulled synchronously between batch dispatches; a slow reader
    /// delays dispatch but never reorders batches.
    pub async fn ingest_lines<I>(&self, lines: I) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        self.ingest_byte_lines(
            lines
                .into_iter()
                .map(|line| line.map(String::into_bytes)),
        )
        .await
    }

    /// Consume undecoded `lines`, skipping the first as a header.
    ///
    /// A line that is not valid UTF-8 is rejected like any other malformed
    /// line. A read error stops the run after the records parsed so far have
    /// been written.
    pub async fn ingest_byte_lines<I>(&self, lines: I) -> Result<IngestSummary, IngestError>
    where
        I: IntoIterator<Item = io::Result<Vec<u8>>>,
    {
        let written_before = self.progress.written();
        let permits = Arc::new(Semaphore::new(self.options.max_in_flight));
        let mut accumulator = BatchAccumulator::new(self.options.batch_size);
        let mut pending = Vec::new();
        let mut summary = IngestSummary::default();

        let mut read_failure = None;
        for (line_number, bytes) in (1_u64..).zip(lines) {
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(source) => {
                    read_failure = Some((line_number, source));
                    break;
                }
            };
            if line_number == 1 {
                debug!("skipping header line {:?}", String::from_utf8_lossy(&bytes));
                continue;
            }
            summary.lines_read += 1;

            let parsed = match decode_line(bytes) {
                Ok(line) if line.trim().is_empty() => {
                    summary.blank_lines += 1;
                    continue;
                }
                Ok(line) => parse_line(&line).map_err(|reason| (line, reason)),
                Err(undecodable) => Err(undecodable),
            };

            match parsed {
                Ok(record) => {
                    if let Some(batch) = accumulator.push(record) {
                        pending.push(self.dispatch(batch, &permits).await);
                    }
                }
                Err((line, reason)) => {
                    warn!("skipping line {line_number} ({line:?}): {reason}");
                    summary.rejections.push(LineRejection {
                        line_number,
                        line,
                        reason,
                    });
                }
            }
        }

        if let Some(batch) = accumulator.finish() {
            pending.push(self.dispatch(batch, &permits).await);
        }

        summary.batches_submitted = accumulator.batches_cut();
        summary.batch_failures = collect_failures(pending).await;
        summary.records_written = self.progress.written() - written_before;

        if let Some((line_number, source)) = read_failure {
            error!(
                "reading stopped at line {line_number}: {source}; {} POIs written before the failure",
                summary.records_written
            );
            return Err(IngestError::Read {
                line_number,
                source,
                partial: Box::new(summary),
            });
        }

        info!(
            "ingested {} POIs from {} lines ({} rejected, {} blank, {} failed batches)",
            summary.records_written,
            summary.lines_read,
            summary.rejected(),
            summary.blank_lines,
            summary.batch_failures.len()
        );
        Ok(summary)
    }

    async fn dispatch(&self, batch: Batch, permits: &Arc<Semaphore>) -> PendingBatch {
        // The semaphore is never closed.
        let permit = Arc::clone(permits).acquire_owned().await.ok();
        let index = Arc::clone(&self.index);
        let progress = Arc::clone(&self.progress);
        let sequence = batch.sequence;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            let count = batch.records.len() as u64;
            let outcome = index.upsert_batch(&batch.records).await;
            progress.record_completed();
            match outcome {
                Ok(()) => {
                    let total = progress.record_written(count);
                    info!("saving {count} POIs now {total}");
                    Ok(())
                }
                Err(err) => {
                    error!(
                        "batch {} with {count} POIs was not written: {err}",
                        batch.sequence
                    );
                    Err(BatchFailure {
                        sequence: batch.sequence,
                        records: batch.records,
                        error: BatchWriteError::Store(err),
                    })
                }
            }
        });

        PendingBatch { sequence, handle }
    }
}

async fn collect_failures(pending: Vec<PendingBatch>) -> Vec<BatchFailure> {
    let mut failures = Vec::new();
    for PendingBatch { sequence, handle } in pending {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => failures.push(failure),
            Err(join_error) => {
                error!("batch {sequence} writer aborted: {join_error}");
                failures.push(BatchFailure {
                    sequence,
                    records: Vec::new(),
                    error: BatchWriteError::Aborted {
                        message: join_error.to_string(),
                    },
                });
            }
        }
    }
    failures
}
