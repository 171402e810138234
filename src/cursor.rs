//! RowCursor Module
//!
//! すべてのデコーダが実装する、行単位の前方向カーソルの契約。

use crate::api::SheetSelector;
use crate::error::SpreadsheetError;
use crate::types::{Row, SheetCatalog};

/// 行単位のカーソル
///
/// シートを選択し、`advance()`で1行ずつ読み進める。読み出した行は次の
/// `advance()`で上書きされ、過去の行は保持されない。後方へのシークはなく、
/// `rewind()`はストリームを先頭から開き直す。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheetstream::RowCursor;
///
/// # fn main() -> Result<(), sheetstream::SpreadsheetError> {
/// let mut book = sheetstream::open("data.ods")?;
/// for entry in book.sheets().clone().iter() {
///     book.select_sheet(entry.id)?;
///     while book.advance()? {
///         println!("{}: {:?}", entry.name, book.row());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub trait RowCursor {
    /// シートカタログ（宣言順）
    fn sheets(&self) -> &SheetCatalog;

    /// 現在選択されているシートのID
    fn selected_sheet(&self) -> Option<usize>;

    /// シートを選択し、その先頭に位置づける
    ///
    /// 存在しないIDの場合は`UnknownSheetSelector`を返し、現在の選択と位置は変わらない。
    fn select_sheet(&mut self, id: usize) -> Result<(), SpreadsheetError>;

    /// 現在のシートのストリームを開き直し、先頭に戻る
    fn rewind(&mut self) -> Result<(), SpreadsheetError>;

    /// 次の行を読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(true)` - 行を読み込んだ（`row()`で参照できる）
    /// * `Ok(false)` - シートの終端に達した
    fn advance(&mut self) -> Result<bool, SpreadsheetError>;

    /// 最後に読み込んだ行（まだ読み込んでいない場合は空）
    fn row(&self) -> &Row;

    /// 現在のシートで`advance()`が1回以上呼ばれたか
    fn has_advanced(&self) -> bool;

    /// 行数（ヒントがあればヒント、なければこれまでに読み込んだ行数）
    fn row_count(&self) -> usize;

    /// 列数（ヒントがあればヒント、なければこれまでの最大幅）
    fn column_count(&self) -> usize;

    /// ストリームと一時ファイルを解放する
    fn close(&mut self);

    /// シートを名前で選択する
    ///
    /// 同名のシートが複数ある場合は、最後に宣言されたものを選択する。
    fn select_sheet_by_name(&mut self, name: &str) -> Result<(), SpreadsheetError> {
        let id = self.sheets().id_by_name(name).ok_or_else(|| {
            SpreadsheetError::UnknownSheetSelector(SheetSelector::Name(name.to_string()).to_string())
        })?;
        self.select_sheet(id)
    }

    /// IDまたは名前でシートを選択する
    fn select(&mut self, selector: &SheetSelector) -> Result<(), SpreadsheetError> {
        match selector {
            SheetSelector::Id(id) => self.select_sheet(*id),
            SheetSelector::Name(name) => self.select_sheet_by_name(name),
        }
    }

    /// 現在の行を返す
    ///
    /// まだ`advance()`していない場合は、1回だけ暗黙的に`advance()`する。
    fn current_row(&mut self) -> Result<&Row, SpreadsheetError> {
        if !self.has_advanced() {
            self.advance()?;
        }
        Ok(self.row())
    }

    /// 残りの行をイテレータとして取り出す
    ///
    /// 行はクローンされる。エラーが発生した場合は、そのエラーを返した後に終了する。
    fn rows(&mut self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows {
            cursor: self,
            done: false,
        }
    }
}

/// `RowCursor::rows()`が返すイテレータ
pub struct Rows<'a, C: RowCursor> {
    cursor: &'a mut C,
    done: bool,
}

impl<C: RowCursor> Iterator for Rows<'_, C> {
    type Item = Result<Row, SpreadsheetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.advance() {
            Ok(true) => Some(Ok(self.cursor.row().clone())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
