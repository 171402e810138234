//! Builder Module
//!
//! Fluent Builder APIを提供し、`Reader`インスタンスを段階的に構築する。
//! 設定はJSON（camelCaseのキー）からも読み込める。

use crate::api::ContainerFormat;
use crate::decoder::{OdsDecoder, XlsDecoder, XlsxDecoder};
use crate::detect::detect_format;
use crate::error::SpreadsheetError;
use crate::format::NumberLocale;
use crate::spreadsheet::Spreadsheet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 読み込み設定
///
/// # JSONからの読み込み
///
/// ```rust
/// use sheetstream::ReaderOptions;
///
/// let options = ReaderOptions::from_json(r#"{
///     "emitDateAsStructuredValue": true,
///     "sharedStringCacheLimit": 50000,
///     "locale": { "decimalSeparator": ",", "thousandsSeparator": "." }
/// }"#).unwrap();
///
/// assert!(options.emit_date_as_structured_value);
/// assert_eq!(options.shared_string_cache_limit, Some(50000));
/// assert_eq!(options.locale.decimal_separator, ',');
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ReaderOptions {
    /// 展開したパートを置くディレクトリ（`None`ならシステムの一時ディレクトリ）
    pub temp_directory: Option<PathBuf>,

    /// 日付書式のセルを`CellValue::DateTime`として返すか
    pub emit_date_as_structured_value: bool,

    /// 共有文字列をメモリに展開する一意文字列数の上限
    ///
    /// `None`の場合は常に展開します。上限を超えるワークブックでは、
    /// 共有文字列テーブルをストリームのまま参照します。
    pub shared_string_cache_limit: Option<usize>,

    /// 数値表示のロケール
    pub locale: NumberLocale,
}

impl ReaderOptions {
    /// JSON文字列から設定を読み込む
    ///
    /// 未知のキーは`SpreadsheetError::Config`になります。
    pub fn from_json(json: &str) -> Result<Self, SpreadsheetError> {
        serde_json::from_str(json)
            .map_err(|e| SpreadsheetError::Config(format!("Invalid reader options: {}", e)))
    }

    fn validate(&self) -> Result<(), SpreadsheetError> {
        // 1. 一時ディレクトリの検証
        if let Some(dir) = &self.temp_directory {
            if !dir.is_dir() {
                return Err(SpreadsheetError::Config(format!(
                    "Temp directory does not exist or is not a directory: {}",
                    dir.display()
                )));
            }
        }

        // 2. ロケールの検証
        if self.locale.decimal_separator == self.locale.thousands_separator {
            return Err(SpreadsheetError::Config(format!(
                "Decimal and thousands separators must differ (both '{}')",
                self.locale.decimal_separator
            )));
        }

        Ok(())
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetstream::{ReaderBuilder, RowCursor};
///
/// # fn main() -> Result<(), sheetstream::SpreadsheetError> {
/// let reader = ReaderBuilder::new()
///     .with_shared_string_cache_limit(10_000)
///     .with_structured_dates(true)
///     .build()?;
///
/// let mut book = reader.open("large.xlsx")?;
/// for row in book.rows() {
///     println!("{:?}", row?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    options: ReaderOptions,
}

impl ReaderBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 一時ディレクトリ: システムの一時ディレクトリ
    /// - 日付: 書式に従った文字列
    /// - 共有文字列: 常にメモリに展開
    /// - ロケール: 小数点`.`、千の位区切り`,`、通貨記号なし
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の設定からビルダーを生成する
    pub fn from_options(options: ReaderOptions) -> Self {
        Self { options }
    }

    /// 展開したパートを置くディレクトリを指定する
    pub fn with_temp_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.temp_directory = Some(dir.into());
        self
    }

    /// 日付を構造化された値として返すかを指定する
    pub fn with_structured_dates(mut self, enabled: bool) -> Self {
        self.options.emit_date_as_structured_value = enabled;
        self
    }

    /// 共有文字列をメモリに展開する上限を指定する
    ///
    /// 0を指定すると、共有文字列は常にストリームから参照されます。
    pub fn with_shared_string_cache_limit(mut self, limit: usize) -> Self {
        self.options.shared_string_cache_limit = Some(limit);
        self
    }

    /// 数値表示のロケールを指定する
    pub fn with_locale(mut self, locale: NumberLocale) -> Self {
        self.options.locale = locale;
        self
    }

    /// 設定を検証し、`Reader`を生成する
    ///
    /// # 戻り値
    ///
    /// * `Err(SpreadsheetError::Config)` - 一時ディレクトリが存在しない、
    ///   または小数点と千の位区切りが同じ場合
    pub fn build(self) -> Result<Reader, SpreadsheetError> {
        self.options.validate()?;
        Ok(Reader {
            options: self.options,
        })
    }
}

/// 検証済みの設定でスプレッドシートを開くファサード
#[derive(Debug, Clone)]
pub struct Reader {
    options: ReaderOptions,
}

impl Reader {
    /// デフォルト設定の`Reader`
    pub fn new() -> Self {
        Self {
            options: ReaderOptions::default(),
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// ファイルを開く（形式はシグネチャと拡張子から判定）
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Spreadsheet, SpreadsheetError> {
        let path = path.as_ref();
        let format = detect_format(path)?;
        self.open_as(path, format)
    }

    /// 形式を指定してファイルを開く
    pub fn open_as(
        &self,
        path: impl AsRef<Path>,
        format: ContainerFormat,
    ) -> Result<Spreadsheet, SpreadsheetError> {
        let path = path.as_ref();
        let spreadsheet: Spreadsheet = match format {
            ContainerFormat::Xlsx => XlsxDecoder::open(path, &self.options)?.into(),
            ContainerFormat::Ods => OdsDecoder::open(path, &self.options)?.into(),
            ContainerFormat::Xls => XlsDecoder::open(path, &self.options)?.into(),
        };
        Ok(spreadsheet)
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}
