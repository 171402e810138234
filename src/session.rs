//! Session Temp Area Module
//!
//! デコードセッション中に展開したパートを置く一時ディレクトリ。
//! `close()`で明示的に削除し、`Drop`でも削除する。削除の失敗は致命的ではない。

use crate::error::SpreadsheetError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// セッション専用の一時ディレクトリ
#[derive(Debug)]
pub(crate) struct TempArea {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl TempArea {
    /// 一時ディレクトリを作成
    ///
    /// # 引数
    ///
    /// * `base` - 作成先（`None`ならシステムの一時ディレクトリ）
    pub(crate) fn create(base: Option<&Path>) -> Result<Self, SpreadsheetError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sheetstream-");
        let dir = match base {
            Some(base) => builder.tempdir_in(base)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        log::debug!("Created temp area {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 一時ディレクトリを削除する（2回目以降は何もしない）
    pub(crate) fn close(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => log::debug!("Removed temp area {}", self.path.display()),
            Err(e) => log::warn!("Failed to remove temp area {}: {}", self.path.display(), e),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.dir.is_none()
    }
}

impl Drop for TempArea {
    fn drop(&mut self) {
        self.close();
    }
}
