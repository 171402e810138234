//! Format Detection Module
//!
//! ファイルのシグネチャ（ZIP内のパート構成、CFBヘッダ）でコンテナ形式を判定し、
//! 判定できない場合は拡張子で判定する。

use crate::api::ContainerFormat;
use crate::archive::{Archive, ArchiveLimits};
use crate::error::SpreadsheetError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// コンテナ形式を判定する
///
/// # 戻り値
///
/// * `Err(SpreadsheetError::Input)` - ファイルが読めない、または形式を判定できない場合
pub(crate) fn detect_format(path: &Path) -> Result<ContainerFormat, SpreadsheetError> {
    if let Some(format) = sniff(path)? {
        log::debug!("Detected {:?} from signature of {}", format, path.display());
        return Ok(format);
    }
    format_from_extension(path).ok_or_else(|| {
        SpreadsheetError::Input(format!(
            "Unrecognized spreadsheet format: {}",
            path.display()
        ))
    })
}

/// 先頭バイトとZIP内のパート構成から判定する
fn sniff(path: &Path) -> Result<Option<ContainerFormat>, SpreadsheetError> {
    let mut file = File::open(path).map_err(|e| {
        SpreadsheetError::Input(format!("Cannot open '{}': {}", path.display(), e))
    })?;
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let header = &header[..filled];

    if header.starts_with(&CFB_SIGNATURE) {
        return Ok(Some(ContainerFormat::Xls));
    }
    if !header.starts_with(&ZIP_SIGNATURE) {
        return Ok(None);
    }

    // ZIPとして開けない場合は拡張子の判定に任せる
    let Ok(archive) = Archive::open(path, ArchiveLimits::default()) else {
        return Ok(None);
    };
    if archive.contains("xl/workbook.xml") {
        Ok(Some(ContainerFormat::Xlsx))
    } else if archive.contains("content.xml") {
        Ok(Some(ContainerFormat::Ods))
    } else {
        Ok(None)
    }
}

/// 拡張子から判定する（大文字小文字は区別しない）
pub(crate) fn format_from_extension(path: &Path) -> Option<ContainerFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xltx" | "xltm" => Some(ContainerFormat::Xlsx),
        "ods" | "ots" => Some(ContainerFormat::Ods),
        "xls" | "xlt" => Some(ContainerFormat::Xls),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, names: &[&str]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for name in names {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(b"<x/>").unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            format_from_extension(Path::new("a.XLSX")),
            Some(ContainerFormat::Xlsx)
        );
        assert_eq!(
            format_from_extension(Path::new("a.xlsm")),
            Some(ContainerFormat::Xlsx)
        );
        assert_eq!(
            format_from_extension(Path::new("a.ods")),
            Some(ContainerFormat::Ods)
        );
        assert_eq!(
            format_from_extension(Path::new("a.xls")),
            Some(ContainerFormat::Xls)
        );
        assert_eq!(format_from_extension(Path::new("a.csv")), None);
        assert_eq!(format_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_signature_wins_over_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misnamed.xls");
        write_zip(&path, &["mimetype", "content.xml"]);

        assert_eq!(detect_format(&path).unwrap(), ContainerFormat::Ods);
    }

    #[test]
    fn test_xlsx_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.bin");
        write_zip(&path, &["[Content_Types].xml", "xl/workbook.xml"]);

        assert_eq!(detect_format(&path).unwrap(), ContainerFormat::Xlsx);
    }

    #[test]
    fn test_cfb_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.dat");
        let mut bytes = CFB_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, bytes).unwrap();

        assert_eq!(detect_format(&path).unwrap(), ContainerFormat::Xls);
    }

    #[test]
    fn test_unrecognized_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(matches!(
            detect_format(&path),
            Err(SpreadsheetError::Input(_))
        ));
        assert!(matches!(
            detect_format(&dir.path().join("missing.xlsx")),
            Err(SpreadsheetError::Input(_))
        ));
    }
}
