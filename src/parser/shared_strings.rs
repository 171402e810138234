//! Shared String Store Module
//!
//! 共有文字列テーブル（`xl/sharedStrings.xml`）のインデックス解決。
//!
//! 宣言された一意文字列数がキャッシュ上限以下（または上限なし）であれば
//! すべてをメモリに展開し、超える場合はストリームを開いたまま前方向に読み進める。
//! どちらのモードでも、同じインデックスに対して同じ文字列を返す。

use crate::error::SpreadsheetError;
use crate::xml::XmlCursor;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// 共有文字列ストア
#[derive(Debug)]
pub(crate) struct SharedStringStore {
    mode: Mode,
}

enum Mode {
    /// 共有文字列パートが存在しない
    Empty,
    /// インデックス -> 文字列
    Materialized(Vec<String>),
    /// 前方向ストリーム
    Streaming(StreamingTable),
}

impl std::fmt::Debug for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Empty => f.write_str("Empty"),
            Mode::Materialized(strings) => write!(f, "Materialized({} strings)", strings.len()),
            Mode::Streaming(table) => f
                .debug_struct("Streaming")
                .field("path", &table.path)
                .field("position", &table.position)
                .field("declared", &table.declared)
                .finish(),
        }
    }
}

struct StreamingTable {
    path: PathBuf,
    cursor: XmlCursor<BufReader<File>>,
    /// 次に読み出される`<si>`のインデックス
    position: usize,
    /// 最後に解決した(インデックス, 文字列)
    memo: Option<(usize, String)>,
    /// 宣言された一意文字列数
    declared: Option<usize>,
}

impl SharedStringStore {
    /// 共有文字列パートが存在しない場合のストア
    pub(crate) fn empty() -> Self {
        Self { mode: Mode::Empty }
    }

    /// 展開済みの共有文字列パートからストアを構築
    ///
    /// # 引数
    ///
    /// * `path` - 展開された`sharedStrings.xml`
    /// * `limit` - メモリに展開する一意文字列数の上限（`None`なら常に展開）
    pub(crate) fn open(path: &Path, limit: Option<usize>) -> Result<Self, SpreadsheetError> {
        let mut cursor = XmlCursor::open(path)?;
        let declared = read_declared_count(&mut cursor)?;

        let materialize = match (limit, declared) {
            (None, _) => true,
            (Some(limit), Some(count)) => count <= limit,
            (Some(_), None) => false,
        };

        if materialize {
            let mut strings = Vec::with_capacity(declared.unwrap_or(0));
            while cursor.read()? {
                if cursor.is_start(b"si") {
                    strings.push(read_rich_text(&mut cursor, b"si")?);
                }
            }
            log::debug!("Shared strings materialized: {} entries", strings.len());
            return Ok(Self {
                mode: Mode::Materialized(strings),
            });
        }

        log::debug!(
            "Shared strings streamed from {} (declared unique count: {:?})",
            path.display(),
            declared
        );
        Ok(Self {
            mode: Mode::Streaming(StreamingTable {
                path: path.to_path_buf(),
                cursor,
                position: 0,
                memo: None,
                declared,
            }),
        })
    }

    pub(crate) fn is_materialized(&self) -> bool {
        matches!(self.mode, Mode::Materialized(_))
    }

    /// 宣言された一意文字列数（展開済みの場合は実際の件数）
    pub(crate) fn unique_count(&self) -> Option<usize> {
        match &self.mode {
            Mode::Empty => Some(0),
            Mode::Materialized(strings) => Some(strings.len()),
            Mode::Streaming(table) => table.declared,
        }
    }

    /// インデックスに対応する文字列を取得
    ///
    /// 範囲外のインデックスは空文字列。
    pub(crate) fn get(&mut self, index: usize) -> Result<String, SpreadsheetError> {
        match &mut self.mode {
            Mode::Empty => Ok(String::new()),
            Mode::Materialized(strings) => Ok(strings.get(index).cloned().unwrap_or_default()),
            Mode::Streaming(table) => table.get(index),
        }
    }
}

impl StreamingTable {
    fn get(&mut self, index: usize) -> Result<String, SpreadsheetError> {
        if self.declared.is_some_and(|count| index >= count) {
            return Ok(String::new());
        }
        if let Some((memo_index, text)) = &self.memo {
            if *memo_index == index {
                return Ok(text.clone());
            }
        }

        if index < self.position {
            log::trace!(
                "Reopening shared strings to move back from {} to {}",
                self.position,
                index
            );
            self.cursor = XmlCursor::open(&self.path)?;
            self.position = 0;
            self.memo = None;
        }

        while self.cursor.read()? {
            if !self.cursor.is_start(b"si") {
                continue;
            }
            if self.position < index {
                self.cursor.skip_to_end()?;
                self.position += 1;
                continue;
            }
            let text = read_rich_text(&mut self.cursor, b"si")?;
            self.position += 1;
            self.memo = Some((index, text.clone()));
            return Ok(text);
        }

        // 宣言より短いテーブル
        Ok(String::new())
    }
}

/// `<sst>`の`uniqueCount`（なければ`count`）を読む
fn read_declared_count<R: BufRead>(
    cursor: &mut XmlCursor<R>,
) -> Result<Option<usize>, SpreadsheetError> {
    while cursor.read()? {
        if cursor.is_start(b"sst") {
            let unique = cursor.attribute(b"uniqueCount")?;
            let count = match unique {
                Some(value) => Some(value),
                None => cursor.attribute(b"count")?,
            };
            return Ok(count.and_then(|v| v.trim().parse().ok()));
        }
    }
    Ok(None)
}

/// リッチテキスト要素（`<si>`、`<is>`）の開始タグから文字列を読む
///
/// 各ラン（`<r><t>`）を連結する。ふりがな（`<rPh>`）は含めない。
/// 呼び出し後、カーソルは`end`の終了タグに位置する。
pub(crate) fn read_rich_text<R: BufRead>(
    cursor: &mut XmlCursor<R>,
    end: &[u8],
) -> Result<String, SpreadsheetError> {
    let mut text = String::new();
    while cursor.read()? {
        if cursor.is_end(end) {
            break;
        }
        if cursor.is_start(b"t") {
            text.push_str(&cursor.read_text()?);
        } else if cursor.is_start(b"rPh") {
            cursor.skip_to_end()?;
        }
    }
    Ok(text)
}
