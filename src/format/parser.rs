//! FormatParser Module
//!
//! Excel Number Format Stringを解析し、描画に必要な情報（`ParsedFormat`）を生成します。
//! 解析結果は書式IDごとにメモ化されるため、ここでは値に依存する処理を行わない。

use super::sections::{is_elapsed_directive, select_section, split_sections, strip_directives, SectionKind};
use super::tokens::{tokenize_datetime, DateToken};
use super::NumberLocale;

/// 固定のユーロ書式
const EURO_CODE: &str = "[$EUR ]#,##0.00_-";

static GENERAL_SECTION: SectionPattern = SectionPattern::General;

/// 書式の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormatType {
    General,
    Text,
    Percentage,
    DateTime,
    Euro,
    Fraction,
    Scientific,
    Numeric,
    Literal,
}

/// 数値書式のパターン
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumericPattern {
    /// 数字プレースホルダーより前のリテラル（通貨記号を含む）
    pub prefix: String,
    /// 数字プレースホルダーより後のリテラル
    pub suffix: String,
    /// 整数部の最小桁数（`0`の数）
    pub integer_digits: usize,
    /// 小数部の最小桁数（`0`の数）
    pub min_decimals: usize,
    /// 小数部の最大桁数（`0`、`#`、`?`の数）
    pub max_decimals: usize,
    /// 小数点を含むか
    pub decimal_point: bool,
    /// 千の位区切りを行うか
    pub thousands: bool,
    /// 除数（末尾のカンマ1つにつき1000倍）
    pub scale: f64,
    /// 通貨コード（`[$USD-409]` -> "USD"）
    pub currency: Option<String>,
}

/// 1セクション分の解析結果
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SectionPattern {
    General,
    /// `@`: 値をそのまま返す
    Text,
    Percentage {
        decimals: usize,
    },
    DateTime(Vec<DateToken>),
    Euro,
    Fraction {
        /// 整数部を表示するか
        whole: bool,
    },
    Scientific {
        decimals: usize,
        exponent_digits: usize,
    },
    Numeric(NumericPattern),
    /// 数字プレースホルダーを含まないセクション（例: `"-"`）
    Literal(String),
}

impl SectionPattern {
    pub(crate) fn format_type(&self) -> FormatType {
        match self {
            SectionPattern::General => FormatType::General,
            SectionPattern::Text => FormatType::Text,
            SectionPattern::Percentage { .. } => FormatType::Percentage,
            SectionPattern::DateTime(_) => FormatType::DateTime,
            SectionPattern::Euro => FormatType::Euro,
            SectionPattern::Fraction { .. } => FormatType::Fraction,
            SectionPattern::Scientific { .. } => FormatType::Scientific,
            SectionPattern::Numeric(_) => FormatType::Numeric,
            SectionPattern::Literal(_) => FormatType::Literal,
        }
    }
}

/// 解析済みの書式
///
/// 書式ID（numFmtId）とロケールのみから決まる。すべてのセクションを保持し、
/// 符号によるセクション選択は描画時に行う。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedFormat {
    code: String,
    sections: Vec<SectionPattern>,
}

impl ParsedFormat {
    /// 書式コードを解析
    ///
    /// # 引数
    ///
    /// * `code` - 書式コード（例: `#,##0.00;[Red](#,##0.00)`）
    /// * `locale` - 通貨記号のフォールバックに使用するロケール
    pub(crate) fn parse(code: &str, locale: &NumberLocale) -> Self {
        let trimmed = code.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(super::builtin::GENERAL) {
            return Self::general();
        }

        let sections = split_sections(code)
            .iter()
            .map(|section| parse_section(section, locale))
            .collect();

        Self {
            code: code.to_string(),
            sections,
        }
    }

    pub(crate) fn general() -> Self {
        Self {
            code: super::builtin::GENERAL.to_string(),
            sections: vec![SectionPattern::General],
        }
    }

    pub(crate) fn code(&self) -> &str {
        &self.code
    }

    /// 先頭セクションの分類
    pub(crate) fn format_type(&self) -> FormatType {
        self.sections
            .first()
            .map_or(FormatType::General, SectionPattern::format_type)
    }

    /// 値に対応するセクションを選択
    pub(crate) fn section(&self, value: f64) -> (&SectionPattern, SectionKind) {
        let (index, kind) = select_section(self.sections.len(), value);
        match self.sections.get(index) {
            Some(section) => (section, kind),
            None => (&GENERAL_SECTION, SectionKind::Positive),
        }
    }
}

/// 1セクションを分類・解析する
fn parse_section(section: &str, locale: &NumberLocale) -> SectionPattern {
    if section.trim() == EURO_CODE {
        return SectionPattern::Euro;
    }

    let stripped = strip_directives(section);
    let code = stripped.trim();

    if code.is_empty() {
        return SectionPattern::Literal(String::new());
    }
    if code.eq_ignore_ascii_case(super::builtin::GENERAL) {
        return SectionPattern::General;
    }
    if contains_unquoted(code, '@') {
        return SectionPattern::Text;
    }
    if code.ends_with('%') {
        return SectionPattern::Percentage {
            decimals: count_decimals(code),
        };
    }
    if is_datetime_code(code) {
        return SectionPattern::DateTime(tokenize_datetime(code));
    }
    // 末尾の空白（例: `#,##0 `）は表示に含まれる
    parse_numeric(&stripped, locale)
}

/// 先頭のロケール指定（`[$-409]`など）に続けて日付・時刻トークンがあるか
fn is_datetime_code(code: &str) -> bool {
    let mut rest = code;
    while rest.starts_with("[$") {
        match rest.find(']') {
            Some(end) => rest = &rest[end + 1..],
            None => return false,
        }
    }
    if let Some(inner) = rest.strip_prefix('[') {
        if let Some(end) = inner.find(']') {
            return is_elapsed_directive(&inner[..end]);
        }
    }
    rest.chars()
        .next()
        .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's' | 'd' | 'y' | 'e'))
}

fn contains_unquoted(code: &str, target: char) -> bool {
    let mut in_quotes = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == target && !in_quotes => return true,
            _ => {}
        }
    }
    false
}

/// 小数点以降のプレースホルダー数
fn count_decimals(code: &str) -> usize {
    code.split_once('.').map_or(0, |(_, frac)| {
        frac.chars()
            .take_while(|c| matches!(c, '0' | '#' | '?'))
            .count()
    })
}

/// 書式コードの構成要素
#[derive(Debug, Clone, PartialEq)]
enum Piece {
    /// 引用符・エスケープによるリテラル
    Literal(char),
    /// 書式記号として解釈される文字
    Code(char),
    /// 通貨指定`[$…]`の位置
    Currency,
}

impl Piece {
    fn is_placeholder(&self) -> bool {
        matches!(self, Piece::Code('0' | '#' | '?'))
    }
}

fn split_pieces(code: &str, locale: &NumberLocale) -> (Vec<Piece>, Option<String>) {
    let mut pieces = Vec::new();
    let mut currency = None;
    let mut chars = code.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    pieces.push(Piece::Literal(c));
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    pieces.push(Piece::Literal(next));
                }
            }
            '_' | '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                if let Some(directive) = inner.strip_prefix('$') {
                    let symbol = directive.split('-').next().unwrap_or_default();
                    currency = Some(if symbol.is_empty() {
                        locale.currency_symbol.clone()
                    } else {
                        symbol.to_string()
                    });
                    pieces.push(Piece::Currency);
                }
            }
            c => pieces.push(Piece::Code(c)),
        }
    }
    (pieces, currency)
}

fn pieces_to_string(pieces: &[Piece], currency: Option<&str>) -> String {
    pieces
        .iter()
        .map(|p| match p {
            Piece::Literal(c) | Piece::Code(c) => c.to_string(),
            Piece::Currency => currency.unwrap_or_default().to_string(),
        })
        .collect()
}

/// 数値系（Numeric / Fraction / Scientific / Literal）のセクションを解析
fn parse_numeric(code: &str, locale: &NumberLocale) -> SectionPattern {
    let (mut pieces, currency) = split_pieces(code, locale);

    // タイ語ロケールの組み込み書式（t0.00など）
    if pieces.first() == Some(&Piece::Code('t')) {
        pieces.remove(0);
    }

    let code_chars: String = pieces
        .iter()
        .filter_map(|p| match p {
            Piece::Code(c) => Some(*c),
            _ => None,
        })
        .collect();

    if code_chars.contains("?/?") {
        let whole = code_chars.contains(['0', '#']) || code_chars.starts_with("? ?");
        return SectionPattern::Fraction { whole };
    }

    if let Some(pos) = code_chars.find(['E', 'e']) {
        let after = &code_chars[pos + 1..];
        if after.starts_with(['+', '-']) {
            return SectionPattern::Scientific {
                decimals: count_decimals(&code_chars[..pos]),
                exponent_digits: after[1..]
                    .chars()
                    .take_while(|c| matches!(c, '0' | '#'))
                    .count()
                    .max(1),
            };
        }
    }

    // 千の位区切りと、末尾カンマによる除数
    let mut thousands = false;
    let mut scale = 1.0;
    let mut normalized: Vec<Piece> = Vec::with_capacity(pieces.len());
    for (idx, piece) in pieces.iter().enumerate() {
        if *piece == Piece::Code(',') {
            let after_placeholder = normalized.last().is_some_and(Piece::is_placeholder);
            let before_placeholder = pieces.get(idx + 1).is_some_and(Piece::is_placeholder);
            if after_placeholder && before_placeholder {
                thousands = true;
                continue;
            }
            if after_placeholder {
                scale *= 1000.0;
                continue;
            }
        }
        normalized.push(piece.clone());
    }

    // 最初の数字プレースホルダーの連続部分
    let start = normalized.iter().enumerate().position(|(i, p)| {
        p.is_placeholder()
            || (*p == Piece::Code('.') && normalized.get(i + 1).is_some_and(Piece::is_placeholder))
    });
    let Some(start) = start else {
        return SectionPattern::Literal(pieces_to_string(&normalized, currency.as_deref()));
    };
    let end = normalized[start..]
        .iter()
        .position(|p| !(p.is_placeholder() || *p == Piece::Code('.')))
        .map_or(normalized.len(), |len| start + len);

    let run: String = pieces_to_string(&normalized[start..end], None);
    let (integer_part, decimal_part) = match run.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (run.as_str(), None),
    };

    SectionPattern::Numeric(NumericPattern {
        prefix: pieces_to_string(&normalized[..start], currency.as_deref()),
        suffix: pieces_to_string(&normalized[end..], currency.as_deref()),
        integer_digits: integer_part.matches('0').count(),
        min_decimals: decimal_part.map_or(0, |d| d.matches('0').count()),
        max_decimals: decimal_part.map_or(0, |d| d.chars().filter(|c| *c != '.').count()),
        decimal_point: decimal_part.is_some(),
        thousands,
        scale,
        currency,
    })
}
