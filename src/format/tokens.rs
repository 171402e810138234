//! DateToken Module
//!
//! Excelの日付・時刻書式コードを汎用的なパターントークン列に変換します。
//!
//! `m`/`mm`は、時トークンの直後・`:`の直後・秒トークンの直前にある場合は分、
//! それ以外は月として扱います。

/// 月名・曜日名の表記
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameForm {
    /// 完全な名前（例: "January", "Monday"）
    Full,
    /// 3文字の略称（例: "Jan", "Mon"）
    Abbreviated,
    /// 頭文字のみ（例: "J"）
    Initial,
}

/// 経過時間の単位（`[h]`、`[mm]`、`[ss]`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElapsedUnit {
    Hours,
    Minutes,
    Seconds,
}

/// 日付・時刻パターンのトークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DateToken {
    /// 年（2 -> 2桁, 4 -> 4桁）
    Year(usize),
    /// 月の数値（1 -> ゼロ埋めなし, 2 -> 2桁）
    Month(usize),
    /// 月名
    MonthName(NameForm),
    /// 日（1 -> ゼロ埋めなし, 2 -> 2桁）
    Day(usize),
    /// 曜日名
    Weekday(NameForm),
    /// 時（12時間制かどうかは`Meridiem`の有無で決まる）
    Hour(usize),
    /// 分
    Minute(usize),
    /// 秒
    Second(usize),
    /// 秒の小数部（桁数、最大3）
    SubSecond(usize),
    /// 経過時間（単位, 最小桁数）
    Elapsed(ElapsedUnit, usize),
    /// 午前/午後（`short`が真なら"A"/"P"）
    Meridiem { short: bool },
    /// リテラル文字列
    Literal(String),
}

impl DateToken {
    fn is_hour(&self) -> bool {
        matches!(
            self,
            DateToken::Hour(_) | DateToken::Elapsed(ElapsedUnit::Hours, _)
        )
    }
}

/// 書式コードが午前/午後表記を含むか（12時間制の判定）
pub(crate) fn uses_twelve_hour_clock(tokens: &[DateToken]) -> bool {
    tokens
        .iter()
        .any(|t| matches!(t, DateToken::Meridiem { .. }))
}

/// 日付・時刻書式コードをトークン列に変換
///
/// # 引数
///
/// * `code` - 色指定を除去済みのセクション（先頭のロケール指定`[$-xxx]`は含んでいてもよい）
pub(crate) fn tokenize_datetime(code: &str) -> Vec<DateToken> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch.to_ascii_lowercase() {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                let literal: String = chars[i + 1..end].iter().collect();
                push_literal(&mut tokens, &literal);
                i = end + 1;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    push_literal(&mut tokens, &next.to_string());
                }
                i += 2;
            }
            // 幅調整・繰り返し指定は表示に影響しない
            '_' | '*' => i += 2,
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map_or(chars.len(), |p| i + 1 + p);
                let inner: String = chars[i + 1..end].iter().collect::<String>().to_ascii_lowercase();
                let unit = match inner.chars().next() {
                    Some('h') => Some(ElapsedUnit::Hours),
                    Some('m') => Some(ElapsedUnit::Minutes),
                    Some('s') => Some(ElapsedUnit::Seconds),
                    _ => None,
                };
                if let Some(unit) = unit {
                    tokens.push(DateToken::Elapsed(unit, inner.len()));
                }
                i = end + 1;
            }
            'y' => {
                let n = run_length(&chars, i);
                tokens.push(DateToken::Year(if n <= 2 { 2 } else { 4 }));
                i += n;
            }
            'e' => {
                let n = run_length(&chars, i);
                tokens.push(DateToken::Year(4));
                i += n;
            }
            'm' => {
                let n = run_length(&chars, i);
                let token = match n {
                    1 | 2 if is_minute_context(&tokens, &chars, i, i + n) => DateToken::Minute(n),
                    1 | 2 => DateToken::Month(n),
                    3 => DateToken::MonthName(NameForm::Abbreviated),
                    4 => DateToken::MonthName(NameForm::Full),
                    _ => DateToken::MonthName(NameForm::Initial),
                };
                tokens.push(token);
                i += n;
            }
            'd' => {
                let n = run_length(&chars, i);
                let token = match n {
                    1 | 2 => DateToken::Day(n),
                    3 => DateToken::Weekday(NameForm::Abbreviated),
                    _ => DateToken::Weekday(NameForm::Full),
                };
                tokens.push(token);
                i += n;
            }
            'h' => {
                let n = run_length(&chars, i);
                tokens.push(DateToken::Hour(n.min(2)));
                i += n;
            }
            's' => {
                let n = run_length(&chars, i);
                tokens.push(DateToken::Second(n.min(2)));
                i += n;
            }
            'a' => {
                if matches_ignore_case(&chars, i, "am/pm") {
                    tokens.push(DateToken::Meridiem { short: false });
                    i += 5;
                } else if matches_ignore_case(&chars, i, "a/p") {
                    tokens.push(DateToken::Meridiem { short: true });
                    i += 3;
                } else {
                    push_literal(&mut tokens, &ch.to_string());
                    i += 1;
                }
            }
            '.' if matches!(tokens.last(), Some(DateToken::Second(_)))
                && chars.get(i + 1) == Some(&'0') =>
            {
                let n = run_length(&chars, i + 1);
                tokens.push(DateToken::SubSecond(n.min(3)));
                i += 1 + n;
            }
            _ => {
                push_literal(&mut tokens, &ch.to_string());
                i += 1;
            }
        }
    }
    tokens
}

/// 位置`start`から同じ文字（大文字小文字を区別しない）が連続する数
fn run_length(chars: &[char], start: usize) -> usize {
    let target = chars[start].to_ascii_lowercase();
    chars[start..]
        .iter()
        .take_while(|c| c.to_ascii_lowercase() == target)
        .count()
}

fn matches_ignore_case(chars: &[char], start: usize, pattern: &str) -> bool {
    let len = pattern.chars().count();
    chars.len() >= start + len
        && chars[start..start + len]
            .iter()
            .zip(pattern.chars())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

/// `m`/`mm`を分として扱うべき位置かどうか
fn is_minute_context(tokens: &[DateToken], chars: &[char], start: usize, end: usize) -> bool {
    if start > 0 && chars[start - 1] == ':' {
        return true;
    }
    let previous = tokens
        .iter()
        .rev()
        .find(|t| !matches!(t, DateToken::Literal(_)));
    if previous.is_some_and(DateToken::is_hour) {
        return true;
    }
    chars[end..]
        .iter()
        .find(|c| c.is_ascii_alphabetic())
        .is_some_and(|c| c.eq_ignore_ascii_case(&'s'))
}

fn push_literal(tokens: &mut Vec<DateToken>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(DateToken::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(DateToken::Literal(text.to_string()));
    }
}
