//! Workbook Part Parser Module
//!
//! `xl/workbook.xml`と`xl/_rels/workbook.xml.rels`から、シートカタログ・
//! ワークシートパートのパス・1904年エポックフラグを取得します。

use crate::error::SpreadsheetError;
use crate::types::SheetCatalog;
use crate::xml::XmlCursor;
use std::collections::{HashMap, HashSet};

/// workbook.xmlの解析結果
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkbookPart {
    /// シートID -> シート名（宣言順）
    pub sheets: SheetCatalog,
    /// シートID -> アーカイブ内のワークシートパス
    pub parts: HashMap<usize, String>,
    /// `<workbookPr date1904="1"/>`
    pub date1904: bool,
}

impl WorkbookPart {
    /// workbook.xmlとリレーションシップを解析
    ///
    /// # 引数
    ///
    /// * `workbook` - `xl/workbook.xml`のバイト列
    /// * `rels` - `xl/_rels/workbook.xml.rels`のバイト列（存在しない場合は`None`）
    ///
    /// シートIDはリレーションシップID（`rId3` -> 3）の数字部分から決まる。
    /// 数字を含まない場合や重複した場合は、未使用の次の番号を割り当てる。
    pub(crate) fn parse(workbook: &[u8], rels: Option<&[u8]>) -> Result<Self, SpreadsheetError> {
        let relationships = match rels {
            Some(xml) => parse_relationships(xml)?,
            None => HashMap::new(),
        };

        let mut cursor = XmlCursor::from_reader(workbook);
        let mut part = WorkbookPart::default();
        let mut declared: Vec<(Option<String>, String)> = Vec::new();

        let mut has_root = false;
        while cursor.read()? {
            if cursor.is_start(b"workbook") {
                has_root = true;
            } else if cursor.is_start(b"workbookPr") {
                part.date1904 = matches!(
                    cursor.attribute(b"date1904")?.as_deref(),
                    Some("1") | Some("true")
                );
            } else if cursor.is_start(b"sheet") {
                let name = cursor.attribute(b"name")?.unwrap_or_default();
                // r:id（名前空間プレフィックスは問わない）
                let rel_id = cursor.attribute(b"id")?;
                declared.push((rel_id, name));
            }
        }

        if !has_root {
            return Err(SpreadsheetError::CorruptStructure(
                "xl/workbook.xml has no <workbook> element".to_string(),
            ));
        }

        let mut used = HashSet::new();
        let mut next_free = declared
            .iter()
            .filter_map(|(rel_id, _)| rel_id.as_deref().and_then(numeric_rel_id))
            .max()
            .map_or(0, |max| max + 1);

        for (rel_id, name) in declared {
            let id = match rel_id.as_deref().and_then(numeric_rel_id) {
                Some(id) if used.insert(id) => id,
                _ => {
                    while used.contains(&next_free) {
                        next_free += 1;
                    }
                    used.insert(next_free);
                    next_free
                }
            };

            let path = match rel_id.as_ref().and_then(|r| relationships.get(r)) {
                Some(target) => resolve_target(target),
                None => {
                    if rel_id.is_some() && !relationships.is_empty() {
                        log::warn!(
                            "Sheet '{}' refers to an undeclared relationship; falling back to sheet{}.xml",
                            name,
                            id
                        );
                    }
                    format!("xl/worksheets/sheet{}.xml", id)
                }
            };

            part.parts.insert(id, path);
            part.sheets.push(id, name);
        }

        Ok(part)
    }

    /// シートIDに対応するワークシートパス
    pub(crate) fn part_path(&self, id: usize) -> Option<&str> {
        self.parts.get(&id).map(String::as_str)
    }
}

/// `rId12` -> 12
fn numeric_rel_id(rel_id: &str) -> Option<usize> {
    let digits: String = rel_id.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// リレーションシップファイルを解析（Id -> Target）
pub(crate) fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, SpreadsheetError> {
    let mut cursor = XmlCursor::from_reader(xml);
    let mut relationships = HashMap::new();

    while cursor.read()? {
        if cursor.is_start(b"Relationship") {
            let id = cursor.attribute(b"Id")?;
            let target = cursor.attribute(b"Target")?;
            if let (Some(id), Some(target)) = (id, target) {
                relationships.insert(id, target);
            }
        }
    }

    Ok(relationships)
}

/// ターゲットをアーカイブ内のパスに変換
///
/// 相対パスは`xl/`を基準とし、`/`で始まる場合はアーカイブのルートを基準とする。
fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
