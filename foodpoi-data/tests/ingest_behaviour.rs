//! Behavioural tests for batch ingestion of POI exports.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, io, sync::Arc};

use foodpoi_core::MemoryPoiIndex;
use foodpoi_core::test_support::{CountingIndex, RejectingIndex};
use foodpoi_data::{BatchIngestor, BatchWriteError, IngestOptions, IngestSummary};

type Store = CountingIndex<RejectingIndex<MemoryPoiIndex>>;

#[derive(Default)]
struct Load {
    lines: Vec<String>,
    rejected_ids: Vec<String>,
    store: Option<Arc<Store>>,
    summary: Option<IngestSummary>,
}

#[fixture]
fn load() -> RefCell<Load> {
    RefCell::new(Load::default())
}

fn record_line(index: usize) -> String {
    let latitude = 49.0 + index as f64 * 0.001;
    format!("1|poi-{index}|{latitude}|8.4|Imbiss {index}")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build tokio runtime")
}

fn run_load(load: &RefCell<Load>, batch_size: usize) {
    let mut state = load.borrow_mut();
    let store = Arc::new(CountingIndex::new(RejectingIndex::new(
        MemoryPoiIndex::default(),
        state.rejected_ids.clone(),
    )));
    let ingestor = BatchIngestor::new(
        store.clone(),
        IngestOptions::default().with_batch_size(batch_size),
    )
    .expect("valid options");
    let lines: Vec<io::Result<String>> = std::iter::once("category|id|lat|lon|name".to_owned())
        .chain(state.lines.iter().cloned())
        .map(Ok)
        .collect();
    let summary = runtime()
        .block_on(ingestor.ingest_lines(lines))
        .expect("load completes");
    state.store = Some(store);
    state.summary = Some(summary);
}

fn summary(load: &RefCell<Load>) -> IngestSummary {
    load.borrow().summary.clone().expect("export was loaded")
}

fn store(load: &RefCell<Load>) -> Arc<Store> {
    load.borrow().store.clone().expect("export was loaded")
}

#[given("an export with 4 valid records and 2 malformed lines")]
fn mixed_export(#[from(load)] load: &RefCell<Load>) {
    load.borrow_mut().lines = vec![
        record_line(0),
        "1|poi-x|north|8.4|Broken".to_owned(),
        record_line(1),
        record_line(2),
        "1|poi-y|49.0".to_owned(),
        record_line(3),
    ];
}

#[given("an export with 7 valid records")]
fn valid_export(#[from(load)] load: &RefCell<Load>) {
    load.borrow_mut().lines = (0..7).map(record_line).collect();
}

#[given("a store that rejects record poi-2")]
fn rejecting_store(#[from(load)] load: &RefCell<Load>) {
    load.borrow_mut().rejected_ids = vec!["poi-2".to_owned()];
}

#[when("the export is loaded with batches of 1000")]
fn load_default_batches(#[from(load)] load: &RefCell<Load>) {
    run_load(load, 1000);
}

#[when("the export is loaded with batches of 3")]
fn load_small_batches(#[from(load)] load: &RefCell<Load>) {
    run_load(load, 3);
}

#[then("4 records are stored")]
fn four_stored(#[from(load)] load: &RefCell<Load>) {
    assert_eq!(summary(load).records_written, 4);
    assert_eq!(store(load).inner().inner().len().expect("len"), 4);
}

#[then("7 records are stored")]
fn seven_stored(#[from(load)] load: &RefCell<Load>) {
    assert_eq!(summary(load).records_written, 7);
    assert_eq!(store(load).inner().inner().len().expect("len"), 7);
}

#[then("lines 3 and 6 are reported as rejected")]
fn rejected_lines(#[from(load)] load: &RefCell<Load>) {
    let numbers: Vec<u64> = summary(load)
        .rejections
        .iter()
        .map(|rejection| rejection.line_number)
        .collect();
    assert_eq!(numbers, vec![3, 6]);
}

#[then("the store received batches of 3, 3 and 1 records")]
fn batch_sizes(#[from(load)] load: &RefCell<Load>) {
    assert_eq!(store(load).batch_sizes(), vec![1, 3, 3]);
    assert_eq!(summary(load).batches_submitted, 3);
}

#[then("one failed batch holding 3 records is reported")]
fn failed_batch(#[from(load)] load: &RefCell<Load>) {
    let summary = summary(load);
    assert_eq!(summary.batch_failures.len(), 1);
    let failure = &summary.batch_failures[0];
    assert_eq!(failure.sequence, 0);
    assert_eq!(failure.records.len(), 3);
    assert!(matches!(failure.error, BatchWriteError::Store(_)));
    assert_eq!(summary.records_failed(), 3);
}

#[scenario(path = "tests/features/ingest_pois.feature", index = 0)]
fn bad_lines_are_reported(load: RefCell<Load>) {
    let _ = (load,);
}

#[scenario(path = "tests/features/ingest_pois.feature", index = 1)]
fn records_are_batched(load: RefCell<Load>) {
    let _ = (load,);
}

#[scenario(path = "tests/features/ingest_pois.feature", index = 2)]
fn rejected_batch_is_isolated(load: RefCell<Load>) {
    let _ = (load,);
}
