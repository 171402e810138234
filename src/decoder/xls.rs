//! XLS Decoder Module
//!
//! 旧形式（BIFF）のワークブックをcalamineで読み込み、`RowCursor`として公開する。
//! シートの選択時にそのシートの範囲（`Range<Data>`）を読み込む。

use crate::builder::ReaderOptions;
use crate::cursor::RowCursor;
use crate::error::SpreadsheetError;
use crate::types::{CellValue, Row, SheetCatalog};
use calamine::{open_workbook, Data, Range, Reader, Xls};
use chrono::{NaiveDateTime, Timelike};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 旧形式ワークブックのデコーダ
///
/// シートIDは宣言順（0始まり）です。
pub struct XlsDecoder {
    workbook: Option<Xls<BufReader<File>>>,
    sheets: SheetCatalog,
    selected: Option<usize>,
    range: Option<Range<Data>>,
    next_row: usize,
    row: Row,
    structured_dates: bool,
    advanced: bool,
    rows_read: usize,
    max_width: usize,
}

impl XlsDecoder {
    /// XLSファイルを開く
    pub fn open(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self, SpreadsheetError> {
        let path = path.as_ref();
        let workbook: Xls<_> =
            open_workbook(path).map_err(|e: calamine::XlsError| SpreadsheetError::Legacy(e.into()))?;

        let mut sheets = SheetCatalog::default();
        for (index, name) in workbook.sheet_names().into_iter().enumerate() {
            sheets.push(index, name);
        }
        log::debug!("Opened XLS workbook {} ({} sheets)", path.display(), sheets.len());

        let selected = sheets.first_id();
        Ok(Self {
            workbook: Some(workbook),
            sheets,
            selected,
            range: None,
            next_row: 0,
            row: Row::new(),
            structured_dates: options.emit_date_as_structured_value,
            advanced: false,
            rows_read: 0,
            max_width: 0,
        })
    }

    /// 選択中のシートの範囲を読み込む
    fn load_range(&mut self) -> Result<(), SpreadsheetError> {
        let Some(id) = self.selected else {
            return Ok(());
        };
        let Some(workbook) = self.workbook.as_mut() else {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        };
        let name = self.sheets.name(id).unwrap_or_default().to_string();
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| SpreadsheetError::Legacy(e.into()))?;
        self.range = Some(range);
        Ok(())
    }

    fn reset_position(&mut self) {
        self.range = None;
        self.next_row = 0;
        self.row.clear();
        self.advanced = false;
        self.rows_read = 0;
        self.max_width = 0;
    }

    fn convert(&self, cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::default(),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Text(i.to_string()),
            Data::Float(f) => CellValue::Text(f.to_string()),
            Data::Bool(true) => CellValue::Text("TRUE".to_string()),
            Data::Bool(false) => CellValue::Text("FALSE".to_string()),
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => self.date_value(datetime),
                None => CellValue::Text(dt.as_f64().to_string()),
            },
            Data::DateTimeIso(s) => {
                match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                    Ok(datetime) => self.date_value(datetime),
                    Err(_) => CellValue::Text(s.clone()),
                }
            }
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }

    fn date_value(&self, datetime: NaiveDateTime) -> CellValue {
        if self.structured_dates {
            return CellValue::DateTime(datetime);
        }
        let text = if datetime.num_seconds_from_midnight() == 0 && datetime.nanosecond() == 0 {
            datetime.format("%Y-%m-%d").to_string()
        } else {
            datetime.format("%Y-%m-%d %H:%M:%S").to_string()
        };
        CellValue::Text(text)
    }
}

impl RowCursor for XlsDecoder {
    fn sheets(&self) -> &SheetCatalog {
        &self.sheets
    }

    fn selected_sheet(&self) -> Option<usize> {
        self.selected
    }

    fn select_sheet(&mut self, id: usize) -> Result<(), SpreadsheetError> {
        if self.workbook.is_none() {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        }
        if !self.sheets.contains(id) {
            return Err(SpreadsheetError::UnknownSheetSelector(format!("id {}", id)));
        }
        self.selected = Some(id);
        self.reset_position();
        self.load_range()
    }

    fn rewind(&mut self) -> Result<(), SpreadsheetError> {
        self.reset_position();
        self.load_range()
    }

    fn advance(&mut self) -> Result<bool, SpreadsheetError> {
        self.advanced = true;
        if self.range.is_none() {
            if self.workbook.is_none() || self.selected.is_none() || self.next_row > 0 {
                self.row.clear();
                return Ok(false);
            }
            self.load_range()?;
        }
        let Some(range) = self.range.as_ref() else {
            self.row.clear();
            return Ok(false);
        };
        if self.next_row >= range.height() {
            self.row.clear();
            return Ok(false);
        }

        let start_col = range.start().map_or(0, |(_, col)| col as usize);
        let mut row = Row::with_capacity(start_col + range.width());
        row.resize(start_col, CellValue::default());
        for col in 0..range.width() {
            let value = range
                .get((self.next_row, col))
                .map_or_else(CellValue::default, |cell| self.convert(cell));
            row.push(value);
        }
        while row.last().is_some_and(CellValue::is_empty) {
            row.pop();
        }

        self.row = row;
        self.next_row += 1;
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
        self.range
            .as_ref()
            .map_or(self.rows_read, |range| range.height())
    }

    fn column_count(&self) -> usize {
        self.range.as_ref().map_or(self.max_width, |range| {
            range.start().map_or(0, |(_, col)| col as usize) + range.width()
        })
    }

    fn close(&mut self) {
        self.range = None;
        self.workbook = None;
    }
}

impl std::fmt::Debug for XlsDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsDecoder")
            .field("sheets", &self.sheets)
            .field("selected", &self.selected)
            .field("rows_read", &self.rows_read)
            .finish()
    }
}
