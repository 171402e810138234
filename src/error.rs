//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 書式コードの解釈失敗はエラーとして扱わない（生の値にフォールバックする）。
//! ここに定義されるのは、入力ファイルそのものの問題、構造の破損、
//! シート選択の誤り、設定の誤りのみである。

use thiserror::Error;

/// sheetstreamクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `Input`: 読み込めない、またはコンテナ形式が異なるファイル（ロード時に致命的）
/// - `CorruptStructure` / `MissingSheet`: 期待するパートや要素が存在しない（該当シートのみ致命的）
/// - `CorruptCell`: セル参照（`r`属性）が不正
/// - `UnknownSheetSelector`: 存在しないシートIDまたはシート名を選択した
/// - `Config`: 設定の検証に失敗した
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetstream::{RowCursor, SpreadsheetError};
///
/// fn first_sheet_rows(path: &str) -> Result<usize, SpreadsheetError> {
///     let mut book = sheetstream::open(path)?;
///     let mut count = 0;
///     while book.advance()? {
///         count += 1;
///     }
///     Ok(count)
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SpreadsheetError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイルが読み込めない、または想定したコンテナ形式ではない
    #[error("Input error: {0}")]
    Input(String),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLストリームの解析エラー
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// 旧形式（BIFF）ワークブックのデコードエラー（calamine由来）
    #[error("Failed to decode legacy workbook: {0}")]
    Legacy(#[from] calamine::Error),

    /// 期待するパートまたは要素が存在しない
    #[error("Corrupt structure: {0}")]
    CorruptStructure(String),

    /// 選択されたシートのワークシートパートがアーカイブ内に存在しない
    ///
    /// 影響するのはこのシートのみで、他のシートは引き続き選択・読み込みできます。
    #[error("Worksheet part for sheet {id} ('{name}') is missing")]
    MissingSheet {
        /// シートID
        id: usize,
        /// シート名
        name: String,
    },

    /// セル参照が不正（列文字の範囲外、数字以外の文字など）
    #[error("Corrupt cell reference '{reference}'")]
    CorruptCell {
        /// 問題のあった参照文字列
        reference: String,
    },

    /// 存在しないシートを選択しようとした
    ///
    /// 選択は同期的に失敗し、それまでのカーソル位置は変更されません。
    #[error("Unknown sheet selector: {0}")]
    UnknownSheetSelector(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ReaderBuilder::build()`や`ReaderOptions::from_json()`で発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use sheetstream::{ReaderBuilder, SpreadsheetError};
    ///
    /// let result = ReaderBuilder::new()
    ///     .with_temp_directory("/path/does/not/exist")
    ///     .build();
    ///
    /// match result {
    ///     Err(SpreadsheetError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 展開サイズの上限超過、パストラバーサルを含むエントリ名などで発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
