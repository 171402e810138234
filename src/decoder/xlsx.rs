//! XLSX Decoder Module
//!
//! ワークシートXMLを前方向に読み進め、`<row>`ごとに1行を生成するステートマシン。
//! 共有文字列の解決は`SharedStringStore`、数値の表示形式は`NumberFormatEngine`に委ねる。

use crate::archive::{Archive, ArchiveLimits};
use crate::builder::ReaderOptions;
use crate::cursor::RowCursor;
use crate::error::SpreadsheetError;
use crate::format::{DateSystem, NumberFormatEngine};
use crate::parser::{read_rich_text, SharedStringStore, StyleTable, WorkbookPart};
use crate::session::TempArea;
use crate::types::{column_index, parse_cell_ref, CellValue, Row, SheetCatalog};
use crate::xml::XmlCursor;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// `<c t="…">`の型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    /// `n`または省略
    Number,
    /// `s`: 共有文字列のインデックス
    SharedString,
    /// `inlineStr`
    InlineString,
    /// `str`: 数式の文字列結果
    FormulaString,
    /// `b`
    Boolean,
    /// `e`
    Error,
}

impl CellKind {
    fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("str") => CellKind::FormulaString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            _ => CellKind::Number,
        }
    }
}

/// XLSXワークブックのデコーダ
///
/// ロード時にワークブック情報・スタイル・共有文字列を読み込み、各ワークシートを
/// セッション専用の一時ディレクトリに展開する。行はワークシートXMLから
/// 要求のたびに1行ずつ生成される。
pub struct XlsxDecoder {
    // ストリームは一時ディレクトリより先に解放される（フィールドの宣言順）
    stream: Option<XmlCursor<BufReader<File>>>,
    shared_strings: SharedStringStore,
    engine: NumberFormatEngine,
    workbook: WorkbookPart,
    sheet_paths: HashMap<usize, PathBuf>,
    selected: Option<usize>,
    row: Row,
    advanced: bool,
    finished: bool,
    closed: bool,
    rows_read: usize,
    max_width: usize,
    /// `<dimension ref>`由来の(行数, 列数)
    dimension: Option<(usize, usize)>,
    temp: TempArea,
}

impl XlsxDecoder {
    /// XLSXファイルを開く
    ///
    /// # 引数
    ///
    /// * `path` - 入力ファイル
    /// * `options` - 読み込み設定
    ///
    /// # 戻り値
    ///
    /// * `Err(SpreadsheetError::Input)` - ZIPでない、または`xl/workbook.xml`がない場合
    pub fn open(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self, SpreadsheetError> {
        let path = path.as_ref();
        let mut archive = Archive::open(path, ArchiveLimits::default())?;
        log::trace!("Archive entries: {:?}", archive.entries());

        let workbook_xml = archive.read("xl/workbook.xml")?.ok_or_else(|| {
            SpreadsheetError::Input(format!(
                "'{}' is not an XLSX workbook (xl/workbook.xml is missing)",
                path.display()
            ))
        })?;
        let rels = archive.read("xl/_rels/workbook.xml.rels")?;
        let workbook = WorkbookPart::parse(&workbook_xml, rels.as_deref())?;

        let styles = match archive.read("xl/styles.xml")? {
            Some(xml) => StyleTable::parse(&xml)?,
            None => StyleTable::default(),
        };

        let temp = TempArea::create(options.temp_directory.as_deref())?;

        let shared_strings = match archive.extract("xl/sharedStrings.xml", temp.path())? {
            Some(extracted) => {
                SharedStringStore::open(&extracted, options.shared_string_cache_limit)?
            }
            None => SharedStringStore::empty(),
        };

        let mut sheet_paths = HashMap::new();
        for entry in workbook.sheets.iter() {
            let Some(part) = workbook.part_path(entry.id) else {
                continue;
            };
            if let Some(extracted) = archive.extract(part, temp.path())? {
                sheet_paths.insert(entry.id, extracted);
            }
        }

        let date_system = if workbook.date1904 {
            DateSystem::Excel1904
        } else {
            DateSystem::Excel1900
        };
        let engine = NumberFormatEngine::new(
            styles,
            options.locale.clone(),
            date_system,
            options.emit_date_as_structured_value,
        );

        log::debug!(
            "Opened XLSX workbook {} ({} sheets, {} extracted, {:?} shared strings {})",
            path.display(),
            workbook.sheets.len(),
            sheet_paths.len(),
            shared_strings.unique_count(),
            if shared_strings.is_materialized() {
                "materialized"
            } else {
                "streamed"
            }
        );

        let selected = workbook.sheets.first_id();
        Ok(Self {
            stream: None,
            shared_strings,
            engine,
            workbook,
            sheet_paths,
            selected,
            row: Row::new(),
            advanced: false,
            finished: selected.is_none(),
            closed: false,
            rows_read: 0,
            max_width: 0,
            dimension: None,
            temp,
        })
    }

    fn reset_position(&mut self) {
        self.stream = None;
        self.row.clear();
        self.advanced = false;
        self.finished = false;
        self.rows_read = 0;
        self.max_width = 0;
        self.dimension = None;
    }

    /// 選択中のシートのストリームを開き、`<sheetData>`の直前まで進める
    fn open_stream(&mut self) -> Result<(), SpreadsheetError> {
        if self.closed {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        }
        let Some(id) = self.selected else {
            self.finished = true;
            return Ok(());
        };
        let Some(path) = self.sheet_paths.get(&id) else {
            return Err(SpreadsheetError::MissingSheet {
                id,
                name: self.workbook.sheets.name(id).unwrap_or_default().to_string(),
            });
        };

        let mut stream = XmlCursor::open(path)?;
        let mut dimension = None;
        let mut reached_data = false;
        while stream.read()? {
            if stream.is_start(b"dimension") {
                dimension = stream
                    .attribute(b"ref")?
                    .as_deref()
                    .and_then(parse_dimension);
            } else if stream.is_start(b"sheetData") {
                reached_data = true;
                break;
            }
        }

        if !reached_data {
            return Err(SpreadsheetError::CorruptStructure(format!(
                "Worksheet part for sheet {} has no <sheetData> element",
                id
            )));
        }

        self.dimension = dimension;
        self.stream = Some(stream);
        Ok(())
    }
}

/// `A1:C10` -> (10, 3)
fn parse_dimension(reference: &str) -> Option<(usize, usize)> {
    let last = reference.rsplit(':').next()?;
    let (row, col) = parse_cell_ref(last)?;
    Some((row + 1, col + 1))
}

/// `spans="1:12"`から行幅の下限を求める（複数範囲の場合は最大値）
fn span_width(spans: &str) -> usize {
    spans
        .split_whitespace()
        .filter_map(|range| range.rsplit(':').next()?.parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        .min(crate::types::MAX_COLUMN_INDEX + 1)
}

fn boolean_text(raw: &str) -> String {
    match raw.trim() {
        "1" | "true" => "TRUE".to_string(),
        "0" | "false" => "FALSE".to_string(),
        other => other.to_string(),
    }
}

impl RowCursor for XlsxDecoder {
    fn sheets(&self) -> &SheetCatalog {
        &self.workbook.sheets
    }

    fn selected_sheet(&self) -> Option<usize> {
        self.selected
    }

    fn select_sheet(&mut self, id: usize) -> Result<(), SpreadsheetError> {
        if self.closed {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        }
        if !self.workbook.sheets.contains(id) {
            return Err(SpreadsheetError::UnknownSheetSelector(format!("id {}", id)));
        }
        self.selected = Some(id);
        self.reset_position();
        self.open_stream()
    }

    fn rewind(&mut self) -> Result<(), SpreadsheetError> {
        self.reset_position();
        self.open_stream()
    }

    fn advance(&mut self) -> Result<bool, SpreadsheetError> {
        self.advanced = true;
        if self.finished {
            self.row.clear();
            return Ok(false);
        }
        if self.stream.is_none() {
            self.open_stream()?;
        }
        let Some(stream) = self.stream.as_mut() else {
            self.row.clear();
            return Ok(false);
        };

        // AwaitRow
        let mut found = false;
        while stream.read()? {
            if stream.is_start(b"row") {
                found = true;
                break;
            }
            if stream.is_end(b"sheetData") {
                break;
            }
        }
        if !found {
            self.finished = true;
            self.row.clear();
            return Ok(false);
        }

        // InRow
        let width = stream
            .attribute(b"spans")?
            .as_deref()
            .map_or(0, span_width);
        self.row.clear();
        self.row.resize(width, CellValue::default());

        // 開いている<c>の列番号
        let mut cell: Option<usize> = None;
        let mut next_column = 0usize;
        let mut style: Option<usize> = None;
        let mut kind = CellKind::Number;
        let mut closed_row = false;

        while stream.read()? {
            if stream.is_end(b"row") {
                closed_row = true;
                break;
            }
            if stream.is_start(b"c") {
                let column = match stream.attribute(b"r")? {
                    Some(reference) => column_index(&reference)
                        .ok_or(SpreadsheetError::CorruptCell { reference })?,
                    None => next_column,
                };
                if column > crate::types::MAX_COLUMN_INDEX {
                    return Err(SpreadsheetError::CorruptCell {
                        reference: format!("column {}", column + 1),
                    });
                }
                next_column = column + 1;
                style = stream.attribute(b"s")?.and_then(|s| s.trim().parse().ok());
                kind = CellKind::from_attribute(stream.attribute(b"t")?.as_deref());
                if self.row.len() <= column {
                    self.row.resize(column + 1, CellValue::default());
                }
                cell = Some(column);
            } else if stream.is_end(b"c") {
                cell = None;
            } else if stream.is_start(b"v") || stream.is_start(b"is") {
                let column = cell.ok_or_else(|| {
                    SpreadsheetError::CorruptStructure(format!(
                        "Row {} of sheet {} has a value outside of a <c> element",
                        self.rows_read + 1,
                        self.selected.unwrap_or_default()
                    ))
                })?;
                let value = if stream.is_start(b"is") {
                    CellValue::Text(read_rich_text(stream, b"is")?)
                } else {
                    let raw = stream.read_text()?;
                    match kind {
                        CellKind::SharedString => match raw.trim().parse::<usize>() {
                            Ok(index) => CellValue::Text(self.shared_strings.get(index)?),
                            Err(_) => CellValue::default(),
                        },
                        CellKind::Boolean => CellValue::Text(boolean_text(&raw)),
                        CellKind::InlineString | CellKind::FormulaString | CellKind::Error => {
                            CellValue::Text(raw)
                        }
                        CellKind::Number => self.engine.format(&raw, style),
                    }
                };
                self.row[column] = value;
            } else if stream.is_start(b"f") || stream.is_start(b"extLst") {
                stream.skip_to_end()?;
            }
        }
        if !closed_row {
            self.finished = true;
        }

        self.rows_read += 1;
        self.max_width = self.max_width.max(self.row.len());
        Ok(true)
    }

    fn row(&self) -> &Row {
        &self.row
    }

    fn has_advanced(&self) -> bool {
        self.advanced
    }

    fn row_count(&self) -> usize {
        self.dimension.map_or(self.rows_read, |(rows, _)| rows)
    }

    fn column_count(&self) -> usize {
        self.dimension.map_or(self.max_width, |(_, cols)| cols)
    }

    fn close(&mut self) {
        self.stream = None;
        self.shared_strings = SharedStringStore::empty();
        self.finished = true;
        self.closed = true;
        self.temp.close();
    }
}

impl std::fmt::Debug for XlsxDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxDecoder")
            .field("sheets", &self.workbook.sheets)
            .field("selected", &self.selected)
            .field("rows_read", &self.rows_read)
            .field("closed", &self.closed)
            .field("temp_removed", &self.temp.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("A1:C10"), Some((10, 3)));
        assert_eq!(parse_dimension("B2"), Some((2, 2)));
        assert_eq!(parse_dimension("A1:XFD1048576"), Some((1_048_576, 16_384)));
        assert_eq!(parse_dimension(""), None);
    }

    #[test]
    fn test_span_width() {
        assert_eq!(span_width("1:12"), 12);
        assert_eq!(span_width("2:3 5:9"), 9);
        assert_eq!(span_width("bad"), 0);
    }

    #[test]
    fn test_cell_kind_from_attribute() {
        assert_eq!(CellKind::from_attribute(None), CellKind::Number);
        assert_eq!(CellKind::from_attribute(Some("n")), CellKind::Number);
        assert_eq!(CellKind::from_attribute(Some("s")), CellKind::SharedString);
        assert_eq!(CellKind::from_attribute(Some("inlineStr")), CellKind::InlineString);
        assert_eq!(CellKind::from_attribute(Some("str")), CellKind::FormulaString);
        assert_eq!(CellKind::from_attribute(Some("b")), CellKind::Boolean);
        assert_eq!(CellKind::from_attribute(Some("e")), CellKind::Error);
    }

    #[test]
    fn test_boolean_text() {
        assert_eq!(boolean_text("1"), "TRUE");
        assert_eq!(boolean_text("0"), "FALSE");
        assert_eq!(boolean_text("maybe"), "maybe");
    }
}
