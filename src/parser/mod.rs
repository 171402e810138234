//! Parser Module
//!
//! XLSXのワークブック付随パート（workbook.xml、リレーションシップ、
//! styles.xml、sharedStrings.xml）の解析。

mod shared_strings;
mod styles;
mod workbook;

pub(crate) use shared_strings::{read_rich_text, SharedStringStore};
pub(crate) use styles::StyleTable;
pub(crate) use workbook::WorkbookPart;
