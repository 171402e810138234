//! sheetstream - Streaming row-by-row reader for XLSX and ODS spreadsheets
//!
//! ワークブック全体をメモリに展開せずに、シートを1行ずつ読み出すクレート。
//! XLSXとODSはZIP内のXMLパートを一時ディレクトリに展開してストリームとして読み、
//! 旧形式のXLSはcalamineでデコードする。
//!
//! セル値は既定で、セルの数値書式（日付、パーセント、分数、通貨など）に従って
//! 表示用の文字列に整形されます。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetstream::RowCursor;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 形式はファイルのシグネチャと拡張子から判定される
//!     let mut book = sheetstream::open("example.xlsx")?;
//!
//!     // 最初に宣言されたシートが選択されている
//!     while book.advance()? {
//!         println!("{:?}", book.row());
//!     }
//!
//!     // 一時ファイルを削除する（Drop時にも削除される）
//!     book.close();
//!     Ok(())
//! }
//! ```
//!
//! # Sheet Selection
//!
//! ```rust,no_run
//! use sheetstream::{RowCursor, SheetSelector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut book = sheetstream::open("report.ods")?;
//!
//! for entry in book.sheets().iter() {
//!     println!("{}: {}", entry.id, entry.name);
//! }
//!
//! book.select(&SheetSelector::Name("Summary".to_string()))?;
//! for row in book.rows() {
//!     let row = row?;
//!     println!("{}", row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join("\t"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use sheetstream::{NumberLocale, ReaderBuilder, RowCursor};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = ReaderBuilder::new()
//!         .with_temp_directory("/var/tmp")
//!         .with_shared_string_cache_limit(100_000) // これを超える共有文字列はストリームで参照
//!         .with_structured_dates(true)
//!         .with_locale(NumberLocale {
//!             decimal_separator: ',',
//!             thousands_separator: '.',
//!             currency_symbol: "€".to_string(),
//!         })
//!         .build()?;
//!
//!     let mut book = reader.open("large.xlsx")?;
//!     println!("rows: {}, columns: {}", book.row_count(), book.column_count());
//!     while book.advance()? {
//!         println!("{:?}", book.row());
//!     }
//!     Ok(())
//! }
//! ```

mod api;
mod archive;
mod builder;
mod cursor;
mod decoder;
mod detect;
mod error;
mod format;
mod parser;
mod session;
mod spreadsheet;
mod types;
mod xml;

use std::path::Path;

// 公開API
pub use api::{ContainerFormat, SheetSelector};
pub use builder::{Reader, ReaderBuilder, ReaderOptions};
pub use cursor::{RowCursor, Rows};
pub use decoder::{OdsDecoder, XlsDecoder, XlsxDecoder};
pub use error::SpreadsheetError;
pub use format::NumberLocale;
pub use spreadsheet::Spreadsheet;
pub use types::{CellValue, Row, SheetCatalog, SheetEntry};

/// デフォルト設定でスプレッドシートを開く
///
/// `Reader::new().open(path)`と同じです。
///
/// # 戻り値
///
/// * `Err(SpreadsheetError::Input)` - ファイルが読めない、または形式を判定できない場合
pub fn open(path: impl AsRef<Path>) -> Result<Spreadsheet, SpreadsheetError> {
    Reader::new().open(path)
}
