//! Archive Module
//!
//! ZIPコンテナ（XLSX / ODS）の読み込みと、パートの一時ディレクトリへの展開。
//! ZIP bomb、パストラバーサルへの対策をここでまとめて行う。

use crate::error::SpreadsheetError;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

/// アーカイブの展開制限
#[derive(Debug, Clone)]
pub(crate) struct ArchiveLimits {
    /// アーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 宣言された展開後サイズの合計の上限（バイト）
    /// デフォルト: 4GB
    pub max_total_size: u64,
    /// 単一パートの展開後サイズの上限（バイト）
    /// デフォルト: 2GB
    pub max_entry_size: u64,
    /// メモリに読み込むパート（workbook.xml、styles.xmlなど）の上限（バイト）
    /// デフォルト: 64MB
    pub max_in_memory_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_file_count: 10_000,
            max_total_size: 4_294_967_296,   // 4GB
            max_entry_size: 2_147_483_648,   // 2GB
            max_in_memory_size: 67_108_864, // 64MB
        }
    }
}

/// ZIPアーカイブ
pub(crate) struct Archive {
    zip: ZipArchive<BufReader<File>>,
    names: Vec<String>,
    limits: ArchiveLimits,
}

impl Archive {
    /// アーカイブを開き、ファイル数と展開後サイズの合計を検査する
    ///
    /// # 戻り値
    ///
    /// * `Err(SpreadsheetError::Input)` - ファイルが読めない、またはZIPではない場合
    /// * `Err(SpreadsheetError::SecurityViolation)` - 制限を超えた場合
    pub(crate) fn open(path: &Path, limits: ArchiveLimits) -> Result<Self, SpreadsheetError> {
        let file = File::open(path).map_err(|e| {
            SpreadsheetError::Input(format!("Cannot open '{}': {}", path.display(), e))
        })?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            SpreadsheetError::Input(format!("'{}' is not a ZIP container: {}", path.display(), e))
        })?;

        if zip.len() > limits.max_file_count {
            return Err(SpreadsheetError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                zip.len(),
                limits.max_file_count
            )));
        }

        let mut names = Vec::with_capacity(zip.len());
        let mut total = 0u64;
        for i in 0..zip.len() {
            let entry = zip
                .by_index(i)
                .map_err(|e| SpreadsheetError::Zip(e.to_string()))?;
            total = total.checked_add(entry.size()).ok_or_else(|| {
                SpreadsheetError::SecurityViolation(
                    "Total decompressed size calculation overflow".to_string(),
                )
            })?;
            names.push(entry.name().to_string());
        }
        if total > limits.max_total_size {
            return Err(SpreadsheetError::SecurityViolation(format!(
                "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                total, limits.max_total_size
            )));
        }

        Ok(Self { zip, names, limits })
    }

    /// エントリ名を大文字小文字を区別せずに検索し、実際の名前を返す
    pub(crate) fn find(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| n.as_str() == name)
            .or_else(|| self.names.iter().find(|n| n.eq_ignore_ascii_case(name)))
            .map(String::as_str)
    }

    /// エントリ名の一覧（アーカイブ内の順序）
    pub(crate) fn entries(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// 小さなパートをメモリに読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(None)` - エントリが存在しない場合
    pub(crate) fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, SpreadsheetError> {
        let Some(actual) = self.find(name).map(str::to_string) else {
            return Ok(None);
        };
        let limit = self.limits.max_in_memory_size;
        let entry = match self.zip.by_name(&actual) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(SpreadsheetError::Zip(e.to_string())),
        };

        let mut content = Vec::new();
        entry.take(limit + 1).read_to_end(&mut content)?;
        if content.len() as u64 > limit {
            return Err(SpreadsheetError::SecurityViolation(format!(
                "Part '{}' exceeds maximum in-memory size: {} bytes",
                actual, limit
            )));
        }
        Ok(Some(content))
    }

    /// エントリを`dest`以下に展開する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(path))` - 展開先のパス
    /// * `Ok(None)` - エントリが存在しない場合
    pub(crate) fn extract(
        &mut self,
        name: &str,
        dest: &Path,
    ) -> Result<Option<PathBuf>, SpreadsheetError> {
        let Some(actual) = self.find(name).map(str::to_string) else {
            return Ok(None);
        };
        validate_zip_path(&actual).map_err(|e| {
            SpreadsheetError::SecurityViolation(format!("Invalid ZIP path: {}", e))
        })?;

        let limit = self.limits.max_entry_size;
        let entry = match self.zip.by_name(&actual) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(SpreadsheetError::Zip(e.to_string())),
        };
        if entry.size() > limit {
            return Err(SpreadsheetError::SecurityViolation(format!(
                "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                actual,
                entry.size(),
                limit
            )));
        }

        let target = dest.join(&actual);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        // 宣言サイズが偽装されていても上限で打ち切る
        let written = io::copy(&mut entry.take(limit + 1), &mut out)?;
        if written > limit {
            return Err(SpreadsheetError::SecurityViolation(format!(
                "File '{}' exceeds maximum size while extracting (max: {} bytes)",
                actual, limit
            )));
        }
        Ok(Some(target))
    }
}

/// ZIPエントリ名の検証
///
/// # 戻り値
///
/// * `Ok(())` - 安全なパス
/// * `Err(String)` - 空、絶対パス、`..`、バックスラッシュ、NULを含むパス
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }
    if path.contains('\0') {
        return Err(format!("NUL byte in path: {:?}", path));
    }
    let bytes = path.as_bytes();
    let drive_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || drive_letter {
        return Err(format!("Absolute path is not allowed: {}", path));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }
    Ok(())
}
