//! ODS Decoder Module
//!
//! `content.xml`を前方向に読み進め、N番目の`<table:table>`の行を生成するステートマシン
//! （AwaitTable → AwaitRow → InRow）。
//!
//! 表計算ソフトは書式の都合で大量の空セル・空行を`number-columns-repeated`や
//! `number-rows-repeated`で書き出すため、末尾の空セル・空行は後続に値がある場合のみ展開する。

use crate::archive::{Archive, ArchiveLimits};
use crate::builder::ReaderOptions;
use crate::cursor::RowCursor;
use crate::error::SpreadsheetError;
use crate::session::TempArea;
use crate::types::{CellValue, Row, SheetCatalog, MAX_COLUMN_INDEX};
use crate::xml::{NodeKind, XmlCursor};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// 1行に展開するセル数の上限
const MAX_COLUMNS: usize = MAX_COLUMN_INDEX + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitTable,
    AwaitRow,
    /// `read_row`が行の終了タグまで読み進めている間
    InRow,
    Finished,
}

/// OpenDocumentスプレッドシートのデコーダ
///
/// シートIDは文書内の`<table:table>`の出現順（0始まり）です。
pub struct OdsDecoder {
    // ストリームは一時ディレクトリより先に解放される（フィールドの宣言順）
    stream: Option<XmlCursor<BufReader<File>>>,
    content: PathBuf,
    sheets: SheetCatalog,
    selected: Option<usize>,
    state: State,
    row: Row,
    /// 繰り返し行の残り（行, 残り回数）
    held: Option<(Row, usize)>,
    /// 後続の行が来るまで保留している空行の数
    pending_blank_rows: usize,
    structured_dates: bool,
    advanced: bool,
    closed: bool,
    rows_read: usize,
    max_width: usize,
    temp: TempArea,
}

impl OdsDecoder {
    /// ODSファイルを開き、シート名を事前に走査する
    ///
    /// # 戻り値
    ///
    /// * `Err(SpreadsheetError::Input)` - ZIPでない、または`content.xml`がない場合
    pub fn open(path: impl AsRef<Path>, options: &ReaderOptions) -> Result<Self, SpreadsheetError> {
        let path = path.as_ref();
        let mut archive = Archive::open(path, ArchiveLimits::default())?;
        log::trace!("Archive entries: {:?}", archive.entries());
        let temp = TempArea::create(options.temp_directory.as_deref())?;

        let content = archive.extract("content.xml", temp.path())?.ok_or_else(|| {
            SpreadsheetError::Input(format!(
                "'{}' is not an OpenDocument spreadsheet (content.xml is missing)",
                path.display()
            ))
        })?;

        let sheets = scan_sheet_names(&content)?;
        log::debug!(
            "Opened ODS document {} ({} sheets)",
            path.display(),
            sheets.len()
        );

        let selected = sheets.first_id();
        Ok(Self {
            stream: None,
            content,
            sheets,
            selected,
            state: if selected.is_some() {
                State::AwaitTable
            } else {
                State::Finished
            },
            row: Row::new(),
            held: None,
            pending_blank_rows: 0,
            structured_dates: options.emit_date_as_structured_value,
            advanced: false,
            closed: false,
            rows_read: 0,
            max_width: 0,
            temp,
        })
    }

    fn reopen(&mut self) -> Result<(), SpreadsheetError> {
        if self.closed {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        }
        self.stream = None;
        self.row.clear();
        self.held = None;
        self.pending_blank_rows = 0;
        self.advanced = false;
        self.rows_read = 0;
        self.max_width = 0;
        self.state = if self.selected.is_some() {
            State::AwaitTable
        } else {
            State::Finished
        };
        self.stream = Some(XmlCursor::open(&self.content)?);
        Ok(())
    }

    /// 次の`<table:table-row>`を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some((row, repeat)))` - 行とその繰り返し回数
    /// * `Ok(None)` - テーブルの終端
    fn next_encoded_row(&mut self) -> Result<Option<(Row, usize)>, SpreadsheetError> {
        if self.stream.is_none() {
            self.stream = Some(XmlCursor::open(&self.content)?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        if self.state == State::AwaitTable {
            let target = self.selected.unwrap_or(0);
            let mut index = 0usize;
            let mut found = false;
            while stream.read()? {
                if stream.is_start(b"table") {
                    if index == target {
                        found = true;
                        break;
                    }
                    index += 1;
                    stream.skip_to_end()?;
                }
            }
            if !found {
                self.state = State::Finished;
                return Ok(None);
            }
            self.state = State::AwaitRow;
        }

        while stream.read()? {
            if stream.is_end(b"table") {
                self.state = State::Finished;
                return Ok(None);
            }
            if stream.is_start(b"table-row") {
                let repeat = repeat_count(stream.attribute(b"number-rows-repeated")?);
                self.state = State::InRow;
                let row = read_row(stream, self.structured_dates)?;
                self.state = State::AwaitRow;
                return Ok(Some((row, repeat)));
            }
        }
        self.state = State::Finished;
        Ok(None)
    }
}

fn repeat_count(value: Option<String>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// 文書内のすべてのテーブル名を出現順に取得する
fn scan_sheet_names(content: &Path) -> Result<SheetCatalog, SpreadsheetError> {
    let mut cursor = XmlCursor::open(content)?;
    let mut sheets = SheetCatalog::default();
    let mut index = 0usize;
    while cursor.read()? {
        if cursor.is_start(b"table") {
            let name = cursor.attribute(b"name")?.unwrap_or_default();
            sheets.push(index, name);
            index += 1;
            cursor.skip_to_end()?;
        }
    }
    Ok(sheets)
}

/// `<table:table-row>`の開始タグから1行を読む
///
/// 末尾の空セルは行に含めない。呼び出し後、カーソルは行の終了タグに位置する。
fn read_row<R: BufRead>(
    stream: &mut XmlCursor<R>,
    structured_dates: bool,
) -> Result<Row, SpreadsheetError> {
    let mut row = Row::new();
    let mut pending_blank_cells = 0usize;

    while stream.read()? {
        if stream.is_end(b"table-row") {
            break;
        }
        let covered = stream.is_start(b"covered-table-cell");
        if !(covered || stream.is_start(b"table-cell")) {
            continue;
        }

        let repeat = repeat_count(stream.attribute(b"number-columns-repeated")?);
        let date_value = if structured_dates
            && stream.attribute(b"value-type")?.as_deref() == Some("date")
        {
            stream.attribute(b"date-value")?
        } else {
            None
        };
        let end: &[u8] = if covered {
            b"covered-table-cell"
        } else {
            b"table-cell"
        };
        let text = read_cell_text(stream, end)?;

        let value = match date_value.as_deref().and_then(parse_date_value) {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::Text(text),
        };

        if value.is_empty() {
            pending_blank_cells = pending_blank_cells.saturating_add(repeat);
            continue;
        }

        let available = MAX_COLUMNS.saturating_sub(row.len());
        let blanks = pending_blank_cells.min(available);
        row.resize(row.len() + blanks, CellValue::default());
        pending_blank_cells = 0;

        let available = MAX_COLUMNS.saturating_sub(row.len());
        for _ in 0..repeat.min(available) {
            row.push(value.clone());
        }
    }
    Ok(row)
}

/// セル内の段落を`\n`で連結したテキスト
///
/// 呼び出し後、カーソルはセルの終了タグに位置する。
fn read_cell_text<R: BufRead>(
    stream: &mut XmlCursor<R>,
    end: &[u8],
) -> Result<String, SpreadsheetError> {
    let mut text = String::new();
    let mut paragraphs = 0usize;

    while stream.read()? {
        if stream.is_end(end) {
            break;
        }
        if stream.is_start(b"p") || stream.is_start(b"h") {
            if paragraphs > 0 {
                text.push('\n');
            }
            paragraphs += 1;
            read_paragraph(stream, &mut text)?;
        } else if stream.is_start(b"annotation") {
            stream.skip_to_end()?;
        }
    }
    Ok(text)
}

/// 段落の開始タグから、スペース・タブ・改行要素を展開したテキストを追加する
fn read_paragraph<R: BufRead>(
    stream: &mut XmlCursor<R>,
    out: &mut String,
) -> Result<(), SpreadsheetError> {
    let end = stream.name().to_vec();
    while stream.read()? {
        if stream.is_end(&end) {
            break;
        }
        if stream.kind() == NodeKind::Text {
            out.push_str(stream.text());
        } else if stream.is_start(b"s") {
            let count = repeat_count(stream.attribute(b"c")?);
            out.extend(std::iter::repeat(' ').take(count));
        } else if stream.is_start(b"tab") {
            out.push('\t');
        } else if stream.is_start(b"line-break") {
            out.push('\n');
        } else if stream.is_start(b"annotation") || stream.is_start(b"note") {
            stream.skip_to_end()?;
        }
    }
    Ok(())
}

/// `office:date-value`（`2024-01-15`または`2024-01-15T10:30:00`）を解釈
fn parse_date_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

impl RowCursor for OdsDecoder {
    fn sheets(&self) -> &SheetCatalog {
        &self.sheets
    }

    fn selected_sheet(&self) -> Option<usize> {
        self.selected
    }

    fn select_sheet(&mut self, id: usize) -> Result<(), SpreadsheetError> {
        if self.closed {
            return Err(SpreadsheetError::Input("Decoder is already closed".to_string()));
        }
        if !self.sheets.contains(id) {
            return Err(SpreadsheetError::UnknownSheetSelector(format!("id {}", id)));
        }
        self.selected = Some(id);
        self.reopen()
    }

    fn rewind(&mut self) -> Result<(), SpreadsheetError> {
        self.reopen()
    }

    fn advance(&mut self) -> Result<bool, SpreadsheetError> {
        self.advanced = true;
        loop {
            if self.held.is_some() && self.pending_blank_rows > 0 {
                self.pending_blank_rows -= 1;
                self.row.clear();
                self.rows_read += 1;
                return Ok(true);
            }
            if let Some((row, remaining)) = self.held.as_mut() {
                self.row.clone_from(row);
                *remaining -= 1;
                if *remaining == 0 {
                    self.held = None;
                }
                self.rows_read += 1;
                self.max_width = self.max_width.max(self.row.len());
                return Ok(true);
            }

            if self.state == State::Finished || self.closed {
                self.row.clear();
                return Ok(false);
            }
            match self.next_encoded_row()? {
                Some((row, repeat)) if row.is_empty() => {
                    self.pending_blank_rows = self.pending_blank_rows.saturating_add(repeat);
                }
                Some((row, repeat)) => self.held = Some((row, repeat)),
                None => {
                    // テーブル末尾の空行は出力しない
                    self.pending_blank_rows = 0;
                    self.row.clear();
                    return Ok(false);
                }
            }
        }
    }

    fn row(&self) -> &Row {
        &self.row
    }

    fn has_advanced(&self) -> bool {
        self.advanced
    }

    fn row_count(&self) -> usize {
        self.rows_read
    }

    fn column_count(&self) -> usize {
        self.max_width
    }

    fn close(&mut self) {
        self.stream = None;
        self.held = None;
        self.state = State::Finished;
        self.closed = true;
        self.temp.close();
    }
}

impl std::fmt::Debug for OdsDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdsDecoder")
            .field("sheets", &self.sheets)
            .field("selected", &self.selected)
            .field("state", &self.state)
            .field("rows_read", &self.rows_read)
            .field("temp_removed", &self.temp.is_closed())
            .finish()
    }
}
