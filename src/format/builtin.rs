//! Builtin Format Table
//!
//! 組み込み数値書式（numFmtId 0〜70の一部）の固定テーブル。
//! プロセス全体で共有される不変の定数であり、実行時に変更されない。

/// General書式を表す書式コード
pub(crate) const GENERAL: &str = "General";

/// 組み込み書式IDから書式コードを取得
///
/// # 戻り値
///
/// * `Some(&str)`: 組み込み書式の場合
/// * `None`: 組み込み書式ではない場合（カスタム書式を参照する）
pub(crate) fn builtin_format_code(num_fmt_id: u32) -> Option<&'static str> {
    let code = match num_fmt_id {
        0 => GENERAL,
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        5 => "\"$\"#,##0_);(\"$\"#,##0)",
        6 => "\"$\"#,##0_);[Red](\"$\"#,##0)",
        7 => "\"$\"#,##0.00_);(\"$\"#,##0.00)",
        8 => "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        // 繁体字中国語ロケールの日付
        27 | 36 | 50 | 57 => "[$-404]e/m/d",
        30 => "m/d/yy",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        41 => "_(* #,##0_);_(* \\(#,##0\\);_(* \"-\"_);_(@_)",
        42 => "_(\"$\"* #,##0_);_(\"$\"* \\(#,##0\\);_(\"$\"* \"-\"_);_(@_)",
        43 => "_(* #,##0.00_);_(* \\(#,##0.00\\);_(* \"-\"??_);_(@_)",
        44 => "_(\"$\"* #,##0.00_);_(\"$\"* \\(#,##0.00\\);_(\"$\"* \"-\"??_);_(@_)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        // タイ語ロケールの数値
        59 => "t0",
        60 => "t0.00",
        61 => "t#,##0",
        62 => "t#,##0.00",
        67 => "t0%",
        68 => "t0.00%",
        69 => "t# ?/?",
        70 => "t# ??/??",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin_format_code(0), Some(GENERAL));
        assert_eq!(builtin_format_code(9), Some("0%"));
        assert_eq!(builtin_format_code(14), Some("mm-dd-yy"));
        assert_eq!(builtin_format_code(49), Some("@"));
        assert_eq!(builtin_format_code(164), None);
        assert_eq!(builtin_format_code(23), None);
    }

    #[test]
    fn test_builtin_lookup_is_deterministic() {
        for id in 0..200 {
            assert_eq!(builtin_format_code(id), builtin_format_code(id));
        }
    }
}
