//! Behavioural tests for the export line parser.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

use foodpoi_core::{ParseError, PoiRecord, parse_line};

type ParseOutcome = RefCell<Option<Result<PoiRecord, ParseError>>>;

#[fixture]
fn line() -> RefCell<String> {
    RefCell::new(String::new())
}

#[fixture]
fn outcome() -> ParseOutcome {
    RefCell::new(None)
}

fn expect_record(outcome: &ParseOutcome) -> PoiRecord {
    outcome
        .borrow()
        .as_ref()
        .expect("parser was invoked")
        .as_ref()
        .expect("expected a parsed record")
        .clone()
}

fn expect_error(outcome: &ParseOutcome) -> ParseError {
    outcome
        .borrow()
        .as_ref()
        .expect("parser was invoked")
        .as_ref()
        .expect_err("expected a rejection")
        .clone()
}

#[given("the documented example line")]
fn documented_line(#[from(line)] line: &RefCell<String>) {
    *line.borrow_mut() = "3|poi-42|49.0|8.4|Cafe Roma".to_owned();
}

#[given("a line whose latitude is not a number")]
fn unparsable_latitude(#[from(line)] line: &RefCell<String>) {
    *line.borrow_mut() = "3|poi-42|abc|8.4|Cafe Roma".to_owned();
}

#[given("a line with only four fields")]
fn short_line(#[from(line)] line: &RefCell<String>) {
    *line.borrow_mut() = "3|poi-42|49.0|8.4".to_owned();
}

#[when("the line is parsed")]
fn parse(#[from(line)] line: &RefCell<String>, #[from(outcome)] outcome: &ParseOutcome) {
    *outcome.borrow_mut() = Some(parse_line(&line.borrow()));
}

#[then("a record named Cafe Roma with id poi-42 is produced")]
fn record_identity(#[from(outcome)] outcome: &ParseOutcome) {
    let record = expect_record(outcome);
    assert_eq!(record.name(), "Cafe Roma");
    assert_eq!(record.id(), "poi-42");
    assert_eq!(record.category(), 3);
}

#[then("the record lies at latitude 49.0 and longitude 8.4")]
fn record_location(#[from(outcome)] outcome: &ParseOutcome) {
    let record = expect_record(outcome);
    assert_eq!(record.latitude(), 49.0);
    assert_eq!(record.longitude(), 8.4);
}

#[then("the line is rejected because the latitude field is unparsable")]
fn latitude_rejected(#[from(outcome)] outcome: &ParseOutcome) {
    match expect_error(outcome) {
        ParseError::UnparsableField { field, value } => {
            assert_eq!(field, "latitude");
            assert_eq!(value, "abc");
        }
        other => panic!("expected an unparsable latitude, got {other:?}"),
    }
}

#[then("the line is rejected for having 4 fields")]
fn field_count_rejected(#[from(outcome)] outcome: &ParseOutcome) {
    assert_eq!(
        expect_error(outcome),
        ParseError::WrongFieldCount { found: 4 }
    );
}

#[scenario(path = "tests/features/parse_records.feature", index = 0)]
fn parsing_documented_example(line: RefCell<String>, outcome: ParseOutcome) {
    let _ = (line, outcome);
}

#[scenario(path = "tests/features/parse_records.feature", index = 1)]
fn rejecting_unparsable_latitude(line: RefCell<String>, outcome: ParseOutcome) {
    let _ = (line, outcome);
}

#[scenario(path = "tests/features/parse_records.feature", index = 2)]
fn rejecting_short_line(line: RefCell<String>, outcome: ParseOutcome) {
    let _ = (line, outcome);
}
