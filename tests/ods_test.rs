//! ODS Integration Tests
//!
//! OpenDocument fixtures are written by hand: `content.xml` plus the `mimetype` entry.

mod common;

use common::{texts, write_ods};
use sheetstream::{CellValue, ContainerFormat, ReaderBuilder, RowCursor, SpreadsheetError};
use std::path::PathBuf;

fn cell(text: &str) -> String {
    format!(
        r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
        text
    )
}

fn ods(dir: &tempfile::TempDir, name: &str, tables: &str) -> PathBuf {
    let path = dir.path().join(name);
    write_ods(&path, tables);
    path
}

fn all_rows<C: RowCursor>(cursor: &mut C) -> Vec<Vec<String>> {
    cursor.rows().map(|row| texts(&row.unwrap())).collect()
}

#[test]
fn test_positional_sheet_ids() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Alpha"><table:table-row>{}</table:table-row></table:table>
<table:table table:name="Beta"><table:table-row>{}</table:table-row></table:table>
<table:table table:name="Gamma"><table:table-row>{}</table:table-row></table:table>"#,
        cell("a"),
        cell("b"),
        cell("c")
    );
    let path = ods(&dir, "sheets.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert_eq!(book.format(), ContainerFormat::Ods);
    assert_eq!(book.sheets().ids(), vec![0, 1, 2]);
    assert_eq!(book.sheets().names(), vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(book.selected_sheet(), Some(0));

    assert_eq!(all_rows(&mut book), vec![vec!["a"]]);
    book.select_sheet(2).unwrap();
    assert_eq!(all_rows(&mut book), vec![vec!["c"]]);
    book.select_sheet_by_name("Beta").unwrap();
    assert_eq!(all_rows(&mut book), vec![vec!["b"]]);
}

#[test]
fn test_column_repeat_expands_value() {
    let dir = tempfile::tempdir().unwrap();
    let tables = r#"<table:table table:name="Repeat"><table:table-row>
<table:table-cell table:number-columns-repeated="5" office:value-type="string"><text:p>x</text:p></table:table-cell>
</table:table-row></table:table>"#;
    let path = ods(&dir, "repeat.ods", tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());
    assert_eq!(texts(book.row()), vec!["x"; 5]);
    assert_eq!(book.column_count(), 5);
}

#[test]
fn test_row_repeat_and_interior_blank_rows() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Rows">
<table:table-row table:number-rows-repeated="2">{a}</table:table-row>
<table:table-row table:number-rows-repeated="2"><table:table-cell/></table:table-row>
<table:table-row>{b}</table:table-row>
<table:table-row table:number-rows-repeated="1048570"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
</table:table>"#,
        a = cell("a"),
        b = cell("b")
    );
    let path = ods(&dir, "rows.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    let rows = all_rows(&mut book);
    let expected: Vec<Vec<String>> = vec![
        vec!["a".to_string()],
        vec!["a".to_string()],
        vec![],
        vec![],
        vec!["b".to_string()],
    ];
    // 末尾の空行（表計算ソフトが書き出す埋め草）は出力されない
    assert_eq!(rows, expected);
    assert_eq!(book.row_count(), 5);
}

#[test]
fn test_leading_blank_cells_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Gaps"><table:table-row>
<table:table-cell table:number-columns-repeated="2"/>{}<table:table-cell/>{}<table:table-cell table:number-columns-repeated="3"/>
</table:table-row></table:table>"#,
        cell("c"),
        cell("e")
    );
    let path = ods(&dir, "gaps.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());
    assert_eq!(texts(book.row()), vec!["", "", "c", "", "e"]);
}

#[test]
fn test_paragraph_content() {
    let dir = tempfile::tempdir().unwrap();
    let tables = r#"<table:table table:name="Text"><table:table-row>
<table:table-cell office:value-type="string"><text:p>first<text:s text:c="2"/>line</text:p><text:p>second<text:tab/>part</text:p></table:table-cell>
<table:table-cell office:value-type="string"><office:annotation><text:p>comment</text:p></office:annotation><text:p>shown</text:p></table:table-cell>
<table:table-cell office:value-type="float" office:value="3.5"><text:p>3,50 €</text:p></table:table-cell>
</table:table-row></table:table>"#;
    let path = ods(&dir, "text.ods", tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());
    assert_eq!(
        texts(book.row()),
        vec!["first  line\nsecond\tpart", "shown", "3,50 €"]
    );
}

#[test]
fn test_covered_cells_occupy_columns() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Merged"><table:table-row>
<table:table-cell table:number-columns-spanned="2" office:value-type="string"><text:p>wide</text:p></table:table-cell><table:covered-table-cell/>{}
</table:table-row></table:table>"#,
        cell("after")
    );
    let path = ods(&dir, "merged.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());
    assert_eq!(texts(book.row()), vec!["wide", "", "after"]);
}

#[test]
fn test_structured_dates() {
    let dir = tempfile::tempdir().unwrap();
    let tables = r#"<table:table table:name="Dates"><table:table-row>
<table:table-cell office:value-type="date" office:date-value="2024-01-15T10:30:00"><text:p>15/01/2024 10:30</text:p></table:table-cell>
<table:table-cell office:value-type="date" office:date-value="2024-02-29"><text:p>29/02/2024</text:p></table:table-cell>
</table:table-row></table:table>"#;
    let path = ods(&dir, "dates.ods", tables);

    // 既定では表示テキスト
    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());
    assert_eq!(texts(book.row()), vec!["15/01/2024 10:30", "29/02/2024"]);

    let reader = ReaderBuilder::new().with_structured_dates(true).build().unwrap();
    let mut book = reader.open(&path).unwrap();
    assert!(book.advance().unwrap());
    let first = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    let second = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(
        book.row(),
        &vec![CellValue::DateTime(first), CellValue::DateTime(second)]
    );
}

#[test]
fn test_rewind_replays_rows() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Replay"><table:table-row>{}</table:table-row><table:table-row>{}</table:table-row></table:table>"#,
        cell("one"),
        cell("two")
    );
    let path = ods(&dir, "replay.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    let first = all_rows(&mut book);
    book.rewind().unwrap();
    let second = all_rows(&mut book);

    assert_eq!(first, vec![vec!["one"], vec!["two"]]);
    assert_eq!(first, second);
}

#[test]
fn test_unknown_sheet_keeps_position() {
    let dir = tempfile::tempdir().unwrap();
    let tables = format!(
        r#"<table:table table:name="Only"><table:table-row>{}</table:table-row><table:table-row>{}</table:table-row></table:table>"#,
        cell("one"),
        cell("two")
    );
    let path = ods(&dir, "only.ods", &tables);

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.advance().unwrap());

    assert!(matches!(
        book.select_sheet(1),
        Err(SpreadsheetError::UnknownSheetSelector(_))
    ));
    assert!(matches!(
        book.select_sheet_by_name("Missing"),
        Err(SpreadsheetError::UnknownSheetSelector(_))
    ));

    assert_eq!(book.selected_sheet(), Some(0));
    assert_eq!(texts(book.row()), vec!["one"]);
    assert!(book.advance().unwrap());
    assert_eq!(texts(book.row()), vec!["two"]);
}

#[test]
fn test_document_without_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = ods(&dir, "empty.ods", "");

    let mut book = sheetstream::open(&path).unwrap();
    assert!(book.sheets().is_empty());
    assert_eq!(book.selected_sheet(), None);
    assert!(!book.advance().unwrap());
}

#[test]
fn test_zip_without_content_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ods");
    common::write_zip(&path, &[("mimetype", "application/vnd.oasis.opendocument.spreadsheet")]);

    assert!(matches!(
        sheetstream::open(&path),
        Err(SpreadsheetError::Input(_))
    ));
}
