//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;

/// シートの選択方法
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetstream::{RowCursor, SheetSelector};
///
/// # fn main() -> Result<(), sheetstream::SpreadsheetError> {
/// let mut book = sheetstream::open("report.xlsx")?;
///
/// // IDで選択
/// book.select(&SheetSelector::Id(2))?;
///
/// // 名前で選択（同名のシートがある場合は最後に宣言されたもの）
/// book.select(&SheetSelector::Name("Summary".to_string()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// シートIDで選択
    ///
    /// XLSXではリレーションシップID由来の番号（飛び番あり）、
    /// ODSおよびXLSでは0始まりの出現順です。
    Id(usize),

    /// シート名で選択
    Name(String),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Id(id) => write!(f, "id {}", id),
            SheetSelector::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

impl From<usize> for SheetSelector {
    fn from(id: usize) -> Self {
        SheetSelector::Id(id)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

/// コンテナ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerFormat {
    /// Office Open XML ワークブック（.xlsx / .xlsm）
    Xlsx,
    /// OpenDocument スプレッドシート（.ods）
    Ods,
    /// 旧形式のバイナリワークブック（.xls）
    Xls,
}
