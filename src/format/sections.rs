//! FormatSection Module
//!
//! 書式コードのセクション分割（正数;負数;ゼロ;テキスト）と、
//! 値の符号によるセクション選択を提供します。

/// セクションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// 正数（または唯一のセクション）
    Positive,
    /// 負数
    Negative,
    /// ゼロ
    Zero,
}

/// 書式コードを`;`でセクションに分割する（最大4つ）
///
/// 引用符、`[`〜`]`、バックスラッシュでエスケープされた`;`は区切りとみなさない。
pub(crate) fn split_sections(code: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut chars = code.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if !in_brackets => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '\\' if !in_quotes => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '[' if !in_quotes => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if !in_quotes => {
                in_brackets = false;
                current.push(ch);
            }
            ';' if !in_quotes && !in_brackets => {
                sections.push(std::mem::take(&mut current));
                if sections.len() == 4 {
                    return sections;
                }
            }
            _ => current.push(ch),
        }
    }
    sections.push(current);
    sections
}

/// 値の符号からセクションを選択する
///
/// # 引数
///
/// * `count` - セクション数（1以上）
/// * `value` - 数値
///
/// # 戻り値
///
/// (セクションのインデックス, 種類)。負数セクションが明示的に選ばれた場合は
/// `SectionKind::Negative`となり、呼び出し側は絶対値を描画する。
pub(crate) fn select_section(count: usize, value: f64) -> (usize, SectionKind) {
    if value < 0.0 && count >= 2 {
        (1, SectionKind::Negative)
    } else if value == 0.0 && count >= 3 {
        (2, SectionKind::Zero)
    } else {
        (0, SectionKind::Positive)
    }
}

/// 色指定・条件指定の角括弧を取り除く
///
/// `[$…]`（通貨・ロケール）と`[h]`/`[mm]`/`[ss]`（経過時間）は残す。
pub(crate) fn strip_directives(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut chars = section.chars().peekable();
    let mut in_quotes = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                out.push(ch);
            }
            '\\' if !in_quotes => {
                out.push(ch);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if !in_quotes => {
                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }
                if inner.starts_with('$') || is_elapsed_directive(&inner) {
                    out.push('[');
                    out.push_str(&inner);
                    out.push(']');
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// `[h]`、`[mm]`、`[ss]`などの経過時間指定かどうか
pub(crate) fn is_elapsed_directive(inner: &str) -> bool {
    let lower = inner.to_ascii_lowercase();
    match lower.chars().next() {
        Some(unit @ ('h' | 'm' | 's')) => lower.chars().all(|c| c == unit),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sections() {
        assert_eq!(split_sections("0.00"), vec!["0.00"]);
        assert_eq!(
            split_sections("#,##0;(#,##0);\"zero\""),
            vec!["#,##0", "(#,##0)", "\"zero\""]
        );
    }

    #[test]
    fn test_split_sections_ignores_quoted_separator() {
        assert_eq!(split_sections("0\";\"0;-0"), vec!["0\";\"0", "-0"]);
        assert_eq!(split_sections("0\\;0"), vec!["0\\;0"]);
    }

    #[test]
    fn test_split_sections_keeps_empty_sections() {
        assert_eq!(split_sections("0;;"), vec!["0", "", ""]);
    }

    #[test]
    fn test_select_section() {
        assert_eq!(select_section(1, -5.0), (0, SectionKind::Positive));
        assert_eq!(select_section(2, -5.0), (1, SectionKind::Negative));
        assert_eq!(select_section(2, 0.0), (0, SectionKind::Positive));
        assert_eq!(select_section(3, 0.0), (2, SectionKind::Zero));
        assert_eq!(select_section(4, 3.0), (0, SectionKind::Positive));
    }

    #[test]
    fn test_strip_directives() {
        assert_eq!(strip_directives("[Red]0.00"), "0.00");
        assert_eq!(strip_directives("[Color10][>100]0"), "0");
        assert_eq!(strip_directives("[$€-407]#,##0"), "[$€-407]#,##0");
        assert_eq!(strip_directives("[h]:mm:ss"), "[h]:mm:ss");
        assert_eq!(strip_directives("\"[Red]\"0"), "\"[Red]\"0");
    }

    #[test]
    fn test_is_elapsed_directive() {
        assert!(is_elapsed_directive("h"));
        assert!(is_elapsed_directive("HH"));
        assert!(is_elapsed_directive("mm"));
        assert!(is_elapsed_directive("ss"));
        assert!(!is_elapsed_directive("Red"));
        assert!(!is_elapsed_directive("hm"));
        assert!(!is_elapsed_directive(""));
    }
}
