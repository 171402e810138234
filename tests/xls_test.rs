//! XLS Integration Tests
//!
//! `tests/fixtures/legacy.xls`はBIFF8形式の小さなワークブックです。
//!
//! - `Data`: B2:D6の範囲。見出し行、日付（書式14）、数値、空セル、末尾が空の行、
//!   真偽値と日時（書式22）を含む
//! - `Notes`: A1:A2の範囲。文字列とエラー値（`#DIV/0!`）

mod common;

use common::texts;
use sheetstream::{CellValue, ContainerFormat, ReaderBuilder, RowCursor};
use std::path::PathBuf;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/legacy.xls")
}

fn all_rows<C: RowCursor>(cursor: &mut C) -> Vec<Vec<String>> {
    cursor.rows().map(|row| texts(&row.unwrap())).collect()
}

fn data_rows() -> Vec<Vec<String>> {
    let rows: Vec<Vec<&str>> = vec![
        vec!["", "Name", "When", "Amount"],
        vec!["", "alpha", "2024-01-15", "42.5"],
        vec!["", "beta", "", "7"],
        vec!["", "gamma"],
        vec!["", "TRUE", "2024-01-15 10:30:00"],
    ];
    rows.into_iter()
        .map(|row| row.into_iter().map(String::from).collect())
        .collect()
}

#[test]
fn test_positional_sheet_ids() {
    let book = sheetstream::open(fixture()).unwrap();
    assert_eq!(book.format(), ContainerFormat::Xls);
    assert_eq!(book.sheets().ids(), vec![0, 1]);
    assert_eq!(book.sheets().names(), vec!["Data", "Notes"]);
    assert_eq!(book.selected_sheet(), Some(0));
}

#[test]
fn test_rows_start_at_range_origin() {
    let mut book = sheetstream::open(fixture()).unwrap();

    // 先頭の空行は出力されず、先頭の空列は空文字列で埋められる
    assert_eq!(all_rows(&mut book), data_rows());
    assert_eq!(book.row_count(), 5);
    assert_eq!(book.column_count(), 4);
}

#[test]
fn test_trailing_empty_cells_are_trimmed() {
    let mut book = sheetstream::open(fixture()).unwrap();
    for _ in 0..4 {
        assert!(book.advance().unwrap());
    }
    assert_eq!(texts(book.row()), vec!["", "gamma"]);
}

#[test]
fn test_select_sheet_and_rewind() {
    let mut book = sheetstream::open(fixture()).unwrap();
    assert!(book.advance().unwrap());
    assert!(book.advance().unwrap());

    book.select_sheet(1).unwrap();
    assert!(!book.has_advanced());
    assert_eq!(all_rows(&mut book), vec![vec!["only"], vec!["#DIV/0!"]]);

    book.rewind().unwrap();
    assert_eq!(all_rows(&mut book), vec![vec!["only"], vec!["#DIV/0!"]]);

    book.select_sheet_by_name("Data").unwrap();
    assert_eq!(all_rows(&mut book), data_rows());
}

#[test]
fn test_structured_dates() {
    let reader = ReaderBuilder::new().with_structured_dates(true).build().unwrap();
    let mut book = reader.open(fixture()).unwrap();

    assert!(book.advance().unwrap());
    assert!(book.advance().unwrap());
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(book.row()[2], CellValue::DateTime(date));
    assert_eq!(book.row()[3], CellValue::Text("42.5".to_string()));
}

#[test]
fn test_detected_by_signature() {
    let dir = tempfile::tempdir().unwrap();
    let renamed = dir.path().join("legacy.dat");
    std::fs::copy(fixture(), &renamed).unwrap();

    let mut book = sheetstream::open(&renamed).unwrap();
    assert_eq!(book.format(), ContainerFormat::Xls);
    assert_eq!(all_rows(&mut book), data_rows());
}

#[test]
fn test_operations_after_close() {
    let mut book = sheetstream::open(fixture()).unwrap();
    book.close();

    assert!(matches!(
        book.select_sheet(1),
        Err(sheetstream::SpreadsheetError::Input(_))
    ));
    assert_eq!(book.selected_sheet(), Some(0));
    assert!(!book.advance().unwrap());
}
