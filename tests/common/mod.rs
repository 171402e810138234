//! Shared fixture builders for the integration tests.
//!
//! Edge-case workbooks are assembled part by part with `zip::ZipWriter` so that
//! relationship ids, missing parts and malformed cells can be controlled exactly.

#![allow(dead_code)]

use sheetstream::{CellValue, Row};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a ZIP archive containing the given (name, content) parts.
pub fn write_zip(path: &Path, parts: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Escape text for use inside an XML element or attribute.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap `<row>` markup into a worksheet part.
pub fn worksheet(rows: &str) -> String {
    worksheet_with_dimension(None, rows)
}

pub fn worksheet_with_dimension(dimension: Option<&str>, rows: &str) -> String {
    let dimension = dimension
        .map(|d| format!(r#"<dimension ref="{}"/>"#, d))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}<sheetData>{}</sheetData></worksheet>"#,
        dimension, rows
    )
}

/// Build a shared-string table with `count`/`uniqueCount` set to the entry count.
pub fn shared_strings(strings: &[&str]) -> String {
    let items: String = strings
        .iter()
        .map(|s| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{items}</sst>"#,
        n = strings.len(),
        items = items
    )
}

/// Build a style table from custom number formats and the numFmtId of each cell format.
pub fn styles(custom: &[(u32, &str)], cell_formats: &[u32]) -> String {
    let num_fmts: String = custom
        .iter()
        .map(|(id, code)| format!(r#"<numFmt numFmtId="{}" formatCode="{}"/>"#, id, escape(code)))
        .collect();
    let xfs: String = cell_formats
        .iter()
        .map(|id| format!(r#"<xf numFmtId="{}" fontId="0" applyNumberFormat="1"/>"#, id))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="{}">{}</numFmts><cellXfs count="{}">{}</cellXfs></styleSheet>"#,
        custom.len(),
        num_fmts,
        cell_formats.len(),
        xfs
    )
}

/// Hand-assembled XLSX package.
#[derive(Default)]
pub struct XlsxPackage {
    date1904: bool,
    /// (name, relationship id, worksheet xml; `None` leaves the part out)
    sheets: Vec<(String, String, Option<String>)>,
    shared_strings: Option<String>,
    styles: Option<String>,
}

impl XlsxPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    pub fn sheet(mut self, name: &str, rel_id: &str, xml: &str) -> Self {
        self.sheets
            .push((name.to_string(), rel_id.to_string(), Some(xml.to_string())));
        self
    }

    /// Declare a sheet whose worksheet part is absent from the archive.
    pub fn missing_sheet(mut self, name: &str, rel_id: &str) -> Self {
        self.sheets.push((name.to_string(), rel_id.to_string(), None));
        self
    }

    pub fn shared_strings(mut self, xml: String) -> Self {
        self.shared_strings = Some(xml);
        self
    }

    pub fn styles(mut self, xml: String) -> Self {
        self.styles = Some(xml);
        self
    }

    pub fn write(&self, path: &Path) {
        let mut sheet_elements = String::new();
        let mut relationships = String::new();
        let mut parts: Vec<(String, String)> = Vec::new();

        for (index, (name, rel_id, xml)) in self.sheets.iter().enumerate() {
            let target = format!("worksheets/{}.xml", rel_id.to_lowercase());
            sheet_elements.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="{}"/>"#,
                escape(name),
                index + 1,
                rel_id
            ));
            relationships.push_str(&format!(
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="{}"/>"#,
                rel_id, target
            ));
            if let Some(xml) = xml {
                parts.push((format!("xl/{}", target), xml.clone()));
            }
        }

        let workbook_pr = if self.date1904 {
            r#"<workbookPr date1904="1"/>"#
        } else {
            "<workbookPr/>"
        };
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}<sheets>{}</sheets></workbook>"#,
            workbook_pr, sheet_elements
        );
        let rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            relationships
        );

        parts.push(("xl/workbook.xml".to_string(), workbook));
        parts.push(("xl/_rels/workbook.xml.rels".to_string(), rels));
        if let Some(xml) = &self.shared_strings {
            parts.push(("xl/sharedStrings.xml".to_string(), xml.clone()));
        }
        if let Some(xml) = &self.styles {
            parts.push(("xl/styles.xml".to_string(), xml.clone()));
        }

        let borrowed: Vec<(&str, &str)> = parts
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_str()))
            .collect();
        write_zip(path, &borrowed);
    }

    /// Write the package into `dir` and return its path.
    pub fn write_in(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        self.write(&path);
        path
    }
}

/// Write an ODS document whose spreadsheet body is `tables`.
pub fn write_ods(path: &Path, tables: &str) {
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2"><office:body><office:spreadsheet>{}</office:spreadsheet></office:body></office:document-content>"#,
        tables
    );
    write_zip(
        path,
        &[
            ("mimetype", "application/vnd.oasis.opendocument.spreadsheet"),
            ("content.xml", &content),
        ],
    );
}

/// Render a row as plain strings (dates in ISO form).
pub fn texts(row: &Row) -> Vec<String> {
    row.iter().map(CellValue::to_string).collect()
}

/// Render a row as plain strings, dropping trailing empty cells.
pub fn trimmed(row: &Row) -> Vec<String> {
    let mut out = texts(row);
    while out.last().is_some_and(|s| s.is_empty()) {
        out.pop();
    }
    out
}

/// Count the entries left under a directory.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
