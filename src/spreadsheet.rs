//! Spreadsheet Module
//!
//! 判定したコンテナ形式に応じたデコーダをまとめる列挙型。

use crate::api::ContainerFormat;
use crate::cursor::RowCursor;
use crate::decoder::{OdsDecoder, XlsDecoder, XlsxDecoder};
use crate::error::SpreadsheetError;
use crate::types::{Row, SheetCatalog};

/// 開いたスプレッドシート
///
/// `RowCursor`を実装し、各メソッドは内部のデコーダに委譲されます。
#[derive(Debug)]
#[non_exhaustive]
pub enum Spreadsheet {
    Xlsx(XlsxDecoder),
    Ods(OdsDecoder),
    Xls(XlsDecoder),
}

impl Spreadsheet {
    /// コンテナ形式
    pub fn format(&self) -> ContainerFormat {
        match self {
            Spreadsheet::Xlsx(_) => ContainerFormat::Xlsx,
            Spreadsheet::Ods(_) => ContainerFormat::Ods,
            Spreadsheet::Xls(_) => ContainerFormat::Xls,
        }
    }

    fn cursor(&self) -> &dyn RowCursor {
        match self {
            Spreadsheet::Xlsx(decoder) => decoder,
            Spreadsheet::Ods(decoder) => decoder,
            Spreadsheet::Xls(decoder) => decoder,
        }
    }

    fn cursor_mut(&mut self) -> &mut dyn RowCursor {
        match self {
            Spreadsheet::Xlsx(decoder) => decoder,
            Spreadsheet::Ods(decoder) => decoder,
            Spreadsheet::Xls(decoder) => decoder,
        }
    }
}

impl RowCursor for Spreadsheet {
    fn sheets(&self) -> &SheetCatalog {
        self.cursor().sheets()
    }

    fn selected_sheet(&self) -> Option<usize> {
        self.cursor().selected_sheet()
    }

    fn select_sheet(&mut self, id: usize) -> Result<(), SpreadsheetError> {
        self.cursor_mut().select_sheet(id)
    }

    fn rewind(&mut self) -> Result<(), SpreadsheetError> {
        self.cursor_mut().rewind()
    }

    fn advance(&mut self) -> Result<bool, SpreadsheetError> {
        self.cursor_mut().advance()
    }

    fn row(&self) -> &Row {
        self.cursor().row()
    }

    fn has_advanced(&self) -> bool {
        self.cursor().has_advanced()
    }

    fn row_count(&self) -> usize {
        self.cursor().row_count()
    }

    fn column_count(&self) -> usize {
        self.cursor().column_count()
    }

    fn close(&mut self) {
        self.cursor_mut().close()
    }
}

impl From<XlsxDecoder> for Spreadsheet {
    fn from(decoder: XlsxDecoder) -> Self {
        Spreadsheet::Xlsx(decoder)
    }
}

impl From<OdsDecoder> for Spreadsheet {
    fn from(decoder: OdsDecoder) -> Self {
        Spreadsheet::Ods(decoder)
    }
}

impl From<XlsDecoder> for Spreadsheet {
    fn from(decoder: XlsDecoder) -> Self {
        Spreadsheet::Xls(decoder)
    }
}
