//! Format Module
//!
//! Excel Number Format Stringの構文解析と適用を提供します。
//!
//! 書式IDの解決（組み込みテーブル → カスタム書式）、書式コードの解析と
//! 書式IDごとのメモ化、数値文字列の描画をまとめて`NumberFormatEngine`が担う。

mod builtin;
mod parser;
mod render;
mod sections;
mod tokens;

use crate::parser::StyleTable;
use crate::types::CellValue;
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub(crate) use builtin::{builtin_format_code, GENERAL};
pub(crate) use parser::{FormatType, ParsedFormat};
pub(crate) use render::{render, RenderContext};

/// 数値表示に使用するロケール
///
/// 既定値はPOSIXロケール相当（小数点`.`、千の位区切り`,`、通貨記号なし）です。
/// 通貨記号は、書式コードの通貨指定にコードが含まれない場合（`[$-409]`など）に使用されます。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct NumberLocale {
    /// 小数点
    pub decimal_separator: char,
    /// 千の位区切り
    pub thousands_separator: char,
    /// 既定の通貨記号
    pub currency_symbol: String,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            thousands_separator: ',',
            currency_symbol: String::new(),
        }
    }
}

/// シリアル日付の基準
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DateSystem {
    /// 1900年方式（1900-02-29補正あり）
    #[default]
    Excel1900,
    /// 1904年方式（`workbookPr date1904="1"`）
    Excel1904,
}

/// 書式IDから書式コードを解決する
///
/// 組み込みテーブルを優先し、なければスタイル情報のカスタム書式を参照する。
/// ID 0または解決できないIDは`General`。
pub(crate) fn resolve_format_code(styles: &StyleTable, num_fmt_id: u32) -> &str {
    builtin_format_code(num_fmt_id)
        .or_else(|| styles.custom_format(num_fmt_id))
        .unwrap_or(GENERAL)
}

/// 数値書式エンジン
///
/// セッションの間、書式IDごとの解析結果を保持する。
#[derive(Debug)]
pub(crate) struct NumberFormatEngine {
    styles: StyleTable,
    locale: NumberLocale,
    date_system: DateSystem,
    structured_dates: bool,
    parsed: HashMap<u32, ParsedFormat>,
}

impl NumberFormatEngine {
    pub(crate) fn new(
        styles: StyleTable,
        locale: NumberLocale,
        date_system: DateSystem,
        structured_dates: bool,
    ) -> Self {
        Self {
            styles,
            locale,
            date_system,
            structured_dates,
            parsed: HashMap::new(),
        }
    }

    /// セルの生の値をスタイルに従って描画する
    ///
    /// # 引数
    ///
    /// * `raw` - `<v>`要素の内容
    /// * `style_id` - セルの`s`属性（cellXfsのインデックス）
    pub(crate) fn format(&mut self, raw: &str, style_id: Option<usize>) -> CellValue {
        let num_fmt_id = style_id
            .and_then(|s| self.styles.num_fmt_id(s))
            .unwrap_or(0);
        if num_fmt_id == 0 || raw.is_empty() {
            return CellValue::Text(raw.to_string());
        }

        let parsed = match self.parsed.entry(num_fmt_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let parsed =
                    ParsedFormat::parse(resolve_format_code(&self.styles, num_fmt_id), &self.locale);
                log::trace!(
                    "Parsed number format {} '{}' as {:?}",
                    num_fmt_id,
                    parsed.code(),
                    parsed.format_type()
                );
                entry.insert(parsed)
            }
        };
        if parsed.format_type() == FormatType::General {
            return CellValue::Text(raw.to_string());
        }

        let ctx = RenderContext {
            locale: &self.locale,
            date_system: self.date_system,
            structured_dates: self.structured_dates,
        };
        render(raw, parsed, &ctx)
    }
}
