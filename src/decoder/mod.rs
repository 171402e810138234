//! Decoder Module
//!
//! コンテナ形式ごとの`RowCursor`実装。

mod ods;
mod xls;
mod xlsx;

pub use ods::OdsDecoder;
pub use xls::XlsDecoder;
pub use xlsx::XlsxDecoder;
