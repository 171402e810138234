//! Style Table Parser Module
//!
//! `xl/styles.xml`から、セルスタイル（cellXfs）→ numFmtId と
//! numFmtId → カスタム書式コードの対応を抽出します。
//! フォント・塗りつぶし・罫線などの表示スタイルは読み込まない。

use crate::error::SpreadsheetError;
use crate::xml::XmlCursor;
use std::collections::HashMap;

/// スタイル情報
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleTable {
    /// cellXfsのインデックス -> numFmtId
    cell_formats: Vec<u32>,
    /// numFmtId -> formatCode（カスタム書式）
    custom: HashMap<u32, String>,
}

impl StyleTable {
    /// styles.xmlの内容を解析
    ///
    /// # 引数
    ///
    /// * `xml` - `xl/styles.xml`のバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(StyleTable)` - 解析に成功した場合
    /// * `Err(SpreadsheetError)` - XMLが不正な場合
    pub(crate) fn parse(xml: &[u8]) -> Result<Self, SpreadsheetError> {
        let mut cursor = XmlCursor::from_reader(xml);
        let mut table = StyleTable::default();
        let mut in_num_fmts = false;
        let mut in_cell_xfs = false;

        while cursor.read()? {
            if cursor.is_start(b"numFmts") {
                in_num_fmts = true;
            } else if cursor.is_end(b"numFmts") {
                in_num_fmts = false;
            } else if cursor.is_start(b"cellXfs") {
                in_cell_xfs = true;
            } else if cursor.is_end(b"cellXfs") {
                in_cell_xfs = false;
            } else if in_num_fmts && cursor.is_start(b"numFmt") {
                // <numFmt numFmtId="165" formatCode="0.000"/>
                let id = cursor.attribute(b"numFmtId")?.and_then(|v| v.parse().ok());
                let code = cursor.attribute(b"formatCode")?;
                if let (Some(id), Some(code)) = (id, code) {
                    table.custom.insert(id, code);
                }
            } else if in_cell_xfs && cursor.is_start(b"xf") {
                let num_fmt_id: u32 = cursor
                    .attribute(b"numFmtId")?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let applied = cursor.attribute(b"applyNumberFormat")?;
                // applyNumberFormat="0"が明示されている場合は General
                let num_fmt_id = match applied.as_deref() {
                    Some("0") | Some("false") => 0,
                    _ => num_fmt_id,
                };
                table.cell_formats.push(num_fmt_id);
                cursor.skip_to_end()?;
            }
        }

        Ok(table)
    }

    /// スタイルインデックスからnumFmtIdを取得
    ///
    /// 範囲外のインデックスは`None`。
    pub(crate) fn num_fmt_id(&self, style: usize) -> Option<u32> {
        self.cell_formats.get(style).copied()
    }

    /// カスタム書式コードを取得
    pub(crate) fn custom_format(&self, num_fmt_id: u32) -> Option<&str> {
        self.custom.get(&num_fmt_id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.cell_formats.len()
    }
}
