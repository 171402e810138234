//! Format Renderer Module
//!
//! 解析済みの書式（`ParsedFormat`）を使って、生の数値文字列を表示用文字列に変換します。
//! 描画できない値は生の値をそのまま返し、エラーにはしない。

use super::parser::{NumericPattern, ParsedFormat, SectionPattern};
use super::sections::SectionKind;
use super::tokens::{uses_twelve_hour_clock, DateToken, ElapsedUnit, NameForm};
use super::{DateSystem, NumberLocale};
use crate::types::CellValue;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MS_PER_DAY: f64 = 86_400_000.0;

/// シリアル値として扱う上限（9999-12-31 を十分に超える値）
const MAX_SERIAL: f64 = 10_000_000.0;

/// 分数の小数部として扱う最大桁数
const MAX_FRACTION_DIGITS: usize = 15;

/// 描画時の設定
pub(crate) struct RenderContext<'a> {
    pub locale: &'a NumberLocale,
    pub date_system: DateSystem,
    pub structured_dates: bool,
}

/// 生の値を書式に従って描画する
///
/// 数値として解釈できない値は書式を適用せずにそのまま返す。
pub(crate) fn render(raw: &str, format: &ParsedFormat, ctx: &RenderContext<'_>) -> CellValue {
    let Some(value) = parse_number(raw) else {
        return CellValue::Text(raw.to_string());
    };

    let (section, kind) = format.section(value);
    // 負数セクションは符号や括弧を自前で持つ
    let value = if kind == SectionKind::Negative {
        value.abs()
    } else {
        value
    };

    let text = match section {
        SectionPattern::General | SectionPattern::Text => raw.to_string(),
        SectionPattern::Literal(text) => text.clone(),
        SectionPattern::Percentage { decimals } => {
            format!("{}%", fixed(value * 100.0, *decimals))
        }
        SectionPattern::DateTime(tokens) => {
            let Some(datetime) = serial_to_datetime(value, ctx.date_system) else {
                return CellValue::Text(raw.to_string());
            };
            if ctx.structured_dates {
                return CellValue::DateTime(datetime);
            }
            format_datetime(datetime, value, tokens)
        }
        SectionPattern::Euro => format!("EUR {}", fixed(value, 2)),
        SectionPattern::Fraction { whole } => format_fraction(value, *whole),
        SectionPattern::Scientific {
            decimals,
            exponent_digits,
        } => format_scientific(value, *decimals, *exponent_digits),
        SectionPattern::Numeric(pattern) => format_numeric(value, pattern, ctx.locale),
    };
    CellValue::Text(text)
}

/// 有限の数値として解釈できる場合のみ`Some`
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Excelシリアル値を日付時刻に変換
///
/// 1900年方式では、存在しない1900-02-29を補正するため、61以降は1日ずらす。
/// 時刻はミリ秒単位に丸める。
pub(crate) fn serial_to_datetime(value: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !value.is_finite() || value.abs() >= MAX_SERIAL {
        return None;
    }

    let total_ms = (value * MS_PER_DAY).round() as i64;
    let ms_per_day = MS_PER_DAY as i64;
    let mut days = total_ms.div_euclid(ms_per_day);
    let ms_of_day = total_ms.rem_euclid(ms_per_day);

    let base = match system {
        DateSystem::Excel1900 => {
            if days > 60 {
                days -= 1;
            }
            NaiveDate::from_ymd_opt(1899, 12, 31)?
        }
        DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
    };
    let date = base.checked_add_signed(Duration::days(days))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (ms_of_day / 1000) as u32,
        ((ms_of_day % 1000) * 1_000_000) as u32,
    )?;
    Some(NaiveDateTime::new(date, time))
}

/// 四捨五入（0から遠い方向）してから固定小数点で表記
fn fixed(value: f64, decimals: usize) -> String {
    let rounded = round_half_away(value, decimals);
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", decimals, rounded)
}

fn round_half_away(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn pad(value: u32, width: usize) -> String {
    if width >= 2 {
        format!("{:02}", value)
    } else {
        value.to_string()
    }
}

fn name(full: &str, form: NameForm) -> &str {
    match form {
        NameForm::Full => full,
        NameForm::Abbreviated => &full[..3],
        NameForm::Initial => &full[..1],
    }
}

fn format_datetime(datetime: NaiveDateTime, serial: f64, tokens: &[DateToken]) -> String {
    let twelve_hour = uses_twelve_hour_clock(tokens);
    let total_ms = (serial * MS_PER_DAY).round() as i64;
    let mut out = String::new();

    for token in tokens {
        match token {
            DateToken::Year(2) => out.push_str(&format!("{:02}", datetime.year().rem_euclid(100))),
            DateToken::Year(_) => out.push_str(&format!("{:04}", datetime.year())),
            DateToken::Month(width) => out.push_str(&pad(datetime.month(), *width)),
            DateToken::MonthName(form) => {
                out.push_str(name(MONTH_NAMES[datetime.month0() as usize], *form))
            }
            DateToken::Day(width) => out.push_str(&pad(datetime.day(), *width)),
            DateToken::Weekday(form) => out.push_str(name(
                WEEKDAY_NAMES[datetime.weekday().num_days_from_monday() as usize],
                *form,
            )),
            DateToken::Hour(width) => {
                let hour = if twelve_hour {
                    match datetime.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    datetime.hour()
                };
                out.push_str(&pad(hour, *width));
            }
            DateToken::Minute(width) => out.push_str(&pad(datetime.minute(), *width)),
            DateToken::Second(width) => out.push_str(&pad(datetime.second(), *width)),
            DateToken::SubSecond(digits) => {
                let millis = format!("{:03}", datetime.nanosecond() / 1_000_000);
                out.push('.');
                out.push_str(&millis[..(*digits).min(3)]);
            }
            DateToken::Elapsed(unit, width) => {
                let divisor = match unit {
                    ElapsedUnit::Hours => 3_600_000,
                    ElapsedUnit::Minutes => 60_000,
                    ElapsedUnit::Seconds => 1_000,
                };
                let elapsed = total_ms.div_euclid(divisor);
                out.push_str(&format!("{:0width$}", elapsed, width = *width));
            }
            DateToken::Meridiem { short } => {
                let am = datetime.hour() < 12;
                out.push_str(match (am, short) {
                    (true, false) => "AM",
                    (false, false) => "PM",
                    (true, true) => "A",
                    (false, true) => "P",
                });
            }
            DateToken::Literal(text) => out.push_str(text),
        }
    }
    out
}

/// 分数表記（最大公約数で約分）
///
/// `whole`が真の場合は整数部を分けて表示し（整数部が0なら省略）、
/// 偽の場合は仮分数として表示する。
fn format_fraction(value: f64, whole: bool) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    let integer = abs.trunc() as u128;

    let text = abs.to_string();
    let digits: String = match text.split_once('.') {
        Some((_, frac)) => frac.chars().take(MAX_FRACTION_DIGITS).collect(),
        None => String::new(),
    };
    let numerator = digits.parse::<u128>().unwrap_or(0);
    if numerator == 0 {
        return format!("{}{}", sign, integer);
    }

    let denominator = 10u128.pow(digits.len() as u32);
    let divisor = gcd(numerator, denominator);
    let (numerator, denominator) = (numerator / divisor, denominator / divisor);

    if whole {
        if integer > 0 {
            format!("{}{} {}/{}", sign, integer, numerator, denominator)
        } else {
            format!("{}{}/{}", sign, numerator, denominator)
        }
    } else {
        format!("{}{}/{}", sign, numerator + integer * denominator, denominator)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn format_scientific(value: f64, decimals: usize, exponent_digits: usize) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let text = format!("{:.*e}", decimals, value.abs());
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    format!(
        "{}{}E{}{:0width$}",
        sign,
        mantissa,
        if exponent < 0 { '-' } else { '+' },
        exponent.abs(),
        width = exponent_digits
    )
}

fn format_numeric(value: f64, pattern: &NumericPattern, locale: &NumberLocale) -> String {
    let scaled = value / pattern.scale;
    let rounded = round_half_away(scaled.abs(), pattern.max_decimals);
    let text = format!("{:.*}", pattern.max_decimals, rounded);
    let (integer_text, fraction_text) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut fraction = fraction_text.to_string();
    while fraction.len() > pattern.min_decimals && fraction.ends_with('0') {
        fraction.pop();
    }

    let mut integer = if integer_text == "0" && pattern.integer_digits == 0 {
        String::new()
    } else {
        integer_text.to_string()
    };
    while integer.len() < pattern.integer_digits {
        integer.insert(0, '0');
    }
    if pattern.thousands {
        integer = group_thousands(&integer, locale.thousands_separator);
    }

    let mut out = String::new();
    if scaled < 0.0 && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&pattern.prefix);
    out.push_str(&integer);
    if pattern.decimal_point {
        out.push(locale.decimal_separator);
        out.push_str(&fraction);
    }
    out.push_str(&pattern.suffix);
    out
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}
