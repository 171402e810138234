//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDateTime;
use std::fmt;

/// XLSXで表現できる最大の列インデックス（`XFD`、0始まり）
pub(crate) const MAX_COLUMN_INDEX: usize = 16_383;

/// セルの値
///
/// 既定ではすべての値は表示用に整形された文字列として返されます。
/// `emitDateAsStructuredValue`を有効にすると、日付書式のセルは
/// `DateTime`として返されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CellValue {
    /// 表示用文字列（空セルは空文字列）
    Text(String),

    /// 日付時刻（構造化出力が有効な場合のみ）
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 空文字列かどうか
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    /// 文字列値への参照（`DateTime`の場合は`None`）
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::DateTime(_) => None,
        }
    }

    /// 日付時刻値（`Text`の場合は`None`）
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            CellValue::Text(_) => None,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl PartialEq<str> for CellValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for CellValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// 1行分のセル値（0始まり、列順）
pub type Row = Vec<CellValue>;

/// シートカタログの1エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// シートID（XLSXではリレーションシップIDから、ODSでは出現順から決まる）
    pub id: usize,
    /// シート名
    pub name: String,
}

/// シートID→シート名の対応表（宣言順）
///
/// IDは連続している必要はありません。XLSXのIDはリレーションシップID
/// （`rId3` → `3`）に由来するため飛び番になり得ますが、ODSのIDは
/// 常に`0..n-1`の連番です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetCatalog {
    entries: Vec<SheetEntry>,
}

impl SheetCatalog {
    pub(crate) fn push(&mut self, id: usize, name: impl Into<String>) {
        self.entries.push(SheetEntry {
            id,
            name: name.into(),
        });
    }

    /// 宣言順のエントリ
    pub fn iter(&self) -> impl Iterator<Item = &SheetEntry> {
        self.entries.iter()
    }

    /// 宣言順のシート名
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// 宣言順のシートID
    pub fn ids(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// IDからシート名を取得
    pub fn name(&self, id: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn contains(&self, id: usize) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// シート名からIDを取得
    ///
    /// 同名のシートが複数ある場合は、最後に宣言されたものが優先されます。
    pub fn id_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| e.id)
    }

    /// 最初に宣言されたシートのID
    pub fn first_id(&self) -> Option<usize> {
        self.entries.first().map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A1形式の参照から列インデックス（0始まり）を取得
///
/// 列文字は1〜3文字の英字で、後ろには数字のみが続く必要がある。
/// `XFD`を超える列は不正とみなす。
///
/// # 戻り値
///
/// * `Some(col)`: 列インデックス（例: "A1" -> 0, "AA10" -> 26）
/// * `None`: 参照が不正な場合
pub(crate) fn column_index(reference: &str) -> Option<usize> {
    let bytes = reference.as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return None;
    }
    if !bytes[letters..].iter().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut col = 0usize;
    for b in &bytes[..letters] {
        col = col * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1;
    }
    let col = col - 1;
    (col <= MAX_COLUMN_INDEX).then_some(col)
}

/// A1形式の参照を(行, 列)（どちらも0始まり）に変換
pub(crate) fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    let col = column_index(reference)?;
    let digits = reference.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let row = digits.parse::<usize>().ok()?.checked_sub(1)?;
    Some((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("b3"), Some(1));
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMN_INDEX));
        assert_eq!(column_index("D"), Some(3));
    }

    #[test]
    fn test_column_index_rejects_malformed() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("A$1"), None);
        assert_eq!(column_index("ABCD1"), None);
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("A1B"), None);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("C10"), Some((9, 2)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("A"), None);
    }

    #[test]
    fn test_catalog_duplicate_names_resolve_to_last() {
        let mut catalog = SheetCatalog::default();
        catalog.push(1, "Data");
        catalog.push(4, "Summary");
        catalog.push(7, "Data");

        assert_eq!(catalog.id_by_name("Data"), Some(7));
        assert_eq!(catalog.id_by_name("Summary"), Some(4));
        assert_eq!(catalog.id_by_name("Missing"), None);
        assert_eq!(catalog.ids(), vec![1, 4, 7]);
        assert_eq!(catalog.first_id(), Some(1));
        assert_eq!(catalog.name(4), Some("Summary"));
        assert!(!catalog.contains(2));
    }

    #[test]
    fn test_cell_value_display_and_compare() {
        let text = CellValue::from("abc");
        assert_eq!(text, "abc");
        assert_eq!(text.to_string(), "abc");
        assert!(CellValue::default().is_empty());

        let dt = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        let value = CellValue::DateTime(dt);
        assert_eq!(value.to_string(), "2024-02-29T13:05:00");
        assert_eq!(value.as_datetime(), Some(dt));
        assert_eq!(value.as_str(), None);
    }
}
