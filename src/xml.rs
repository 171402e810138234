//! XML Cursor Module
//!
//! 前方向のみのタグカーソル。デコーダはこの抽象だけに依存し、
//! `quick-xml`を直接扱うのはこのモジュールのみとする。
//!
//! 空要素（`<c r="A1"/>`）は開始タグと終了タグの組として通知される。

use crate::error::SpreadsheetError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 現在位置のノード種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Start,
    End,
    Text,
}

/// ストリーミングXMLカーソル
///
/// `read()`で1ノードずつ進み、現在のノード種別・要素名・属性・テキストを参照する。
/// 要素名は名前空間プレフィックスを除いたローカル名で比較する。
pub(crate) struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    skip_buf: Vec<u8>,
    kind: NodeKind,
    local: Vec<u8>,
    qualified: Vec<u8>,
    start: Option<BytesStart<'static>>,
    text: String,
}

impl XmlCursor<BufReader<File>> {
    /// ファイルからカーソルを開く
    pub(crate) fn open(path: &Path) -> Result<Self, SpreadsheetError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> XmlCursor<R> {
    pub(crate) fn from_reader(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        // 値の前後の空白（xml:space="preserve"）を保持する
        reader.trim_text(false);
        reader.expand_empty_elements(true);
        reader.check_end_names(false);

        Self {
            reader,
            buf: Vec::new(),
            skip_buf: Vec::new(),
            kind: NodeKind::End,
            local: Vec::new(),
            qualified: Vec::new(),
            start: None,
            text: String::new(),
        }
    }

    /// 次のノードへ進む
    ///
    /// # 戻り値
    ///
    /// * `Ok(true)`: 開始タグ・終了タグ・テキストのいずれかに位置した
    /// * `Ok(false)`: ドキュメント末尾に達した
    pub(crate) fn read(&mut self) -> Result<bool, SpreadsheetError> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) | Event::Empty(e) => {
                    self.kind = NodeKind::Start;
                    self.local.clear();
                    self.local.extend_from_slice(e.local_name().as_ref());
                    self.qualified.clear();
                    self.qualified.extend_from_slice(e.name().as_ref());
                    self.start = Some(e.into_owned());
                    return Ok(true);
                }
                Event::End(e) => {
                    self.kind = NodeKind::End;
                    self.local.clear();
                    self.local.extend_from_slice(e.local_name().as_ref());
                    self.qualified.clear();
                    self.qualified.extend_from_slice(e.name().as_ref());
                    return Ok(true);
                }
                Event::Text(t) => {
                    self.kind = NodeKind::Text;
                    self.text.clear();
                    self.text.push_str(&t.unescape()?);
                    return Ok(true);
                }
                Event::CData(c) => {
                    self.kind = NodeKind::Text;
                    self.text.clear();
                    self.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    return Ok(true);
                }
                Event::Eof => return Ok(false),
                _ => {}
            }
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    /// 現在の要素のローカル名（テキストノードでは直前の要素名）
    pub(crate) fn name(&self) -> &[u8] {
        &self.local
    }

    pub(crate) fn is_start(&self, name: &[u8]) -> bool {
        self.kind == NodeKind::Start && self.local == name
    }

    pub(crate) fn is_end(&self, name: &[u8]) -> bool {
        self.kind == NodeKind::End && self.local == name
    }

    /// 現在のテキストノードの内容
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// 開始タグの属性をローカル名で検索する
    ///
    /// 開始タグ以外に位置している場合は常に`None`。
    pub(crate) fn attribute(&self, name: &[u8]) -> Result<Option<String>, SpreadsheetError> {
        if self.kind != NodeKind::Start {
            return Ok(None);
        }
        let Some(start) = self.start.as_ref() else {
            return Ok(None);
        };
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.local_name().as_ref() == name {
                return Ok(Some(attr.decode_and_unescape_value(&self.reader)?.into_owned()));
            }
        }
        Ok(None)
    }

    /// 現在の開始タグから対応する終了タグまでのテキストを連結して返す
    ///
    /// 子孫要素のテキストも含まれる。呼び出し後、カーソルは終了タグに位置する。
    pub(crate) fn read_text(&mut self) -> Result<String, SpreadsheetError> {
        let mut out = String::new();
        if self.kind != NodeKind::Start {
            return Ok(out);
        }
        let target = self.local.clone();
        let mut depth = 0usize;
        while self.read()? {
            match self.kind {
                NodeKind::Text => out.push_str(&self.text),
                NodeKind::Start if self.local == target => depth += 1,
                NodeKind::End if self.local == target => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// 現在の要素を中身をデコードせずに読み飛ばす
    ///
    /// 呼び出し後、カーソルは対応する終了タグに位置する。
    pub(crate) fn skip_to_end(&mut self) -> Result<(), SpreadsheetError> {
        if self.kind != NodeKind::Start {
            return Ok(());
        }
        self.skip_buf.clear();
        self.reader
            .read_to_end_into(QName(&self.qualified), &mut self.skip_buf)?;
        self.kind = NodeKind::End;
        self.start = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(xml: &str) -> XmlCursor<&[u8]> {
        XmlCursor::from_reader(xml.as_bytes())
    }

    #[test]
    fn test_empty_element_reports_start_and_end() {
        let mut xml = cursor(r#"<row><c r="B2"/></row>"#);

        assert!(xml.read().unwrap());
        assert!(xml.is_start(b"row"));
        assert!(xml.read().unwrap());
        assert!(xml.is_start(b"c"));
        assert_eq!(xml.attribute(b"r").unwrap().as_deref(), Some("B2"));
        assert!(xml.read().unwrap());
        assert!(xml.is_end(b"c"));
        assert!(xml.read().unwrap());
        assert!(xml.is_end(b"row"));
        assert!(!xml.read().unwrap());
    }

    #[test]
    fn test_prefixed_names_use_local_name() {
        let mut xml = cursor(
            r#"<table:table xmlns:table="urn:t" table:name="Sheet&amp;1"></table:table>"#,
        );

        assert!(xml.read().unwrap());
        assert!(xml.is_start(b"table"));
        assert_eq!(xml.attribute(b"name").unwrap().as_deref(), Some("Sheet&1"));
    }

    #[test]
    fn test_read_text_concatenates_descendants() {
        let mut xml = cursor(r#"<p>a<span>b</span> c</p><next/>"#);

        xml.read().unwrap();
        assert_eq!(xml.read_text().unwrap(), "ab c");
        assert!(xml.is_end(b"p"));
        xml.read().unwrap();
        assert!(xml.is_start(b"next"));
    }

    #[test]
    fn test_read_text_preserves_whitespace() {
        let mut xml = cursor(r#"<t xml:space="preserve">  x  </t>"#);

        xml.read().unwrap();
        assert_eq!(xml.read_text().unwrap(), "  x  ");
    }

    #[test]
    fn test_skip_to_end_handles_nesting() {
        let mut xml = cursor(r#"<si><t>a</t><si><t>b</t></si></si><si><t>c</t></si>"#);

        xml.read().unwrap();
        xml.skip_to_end().unwrap();
        assert!(xml.is_end(b"si"));
        xml.read().unwrap();
        assert!(xml.is_start(b"si"));
        assert_eq!(xml.read_text().unwrap(), "c");
    }

    #[test]
    fn test_skip_empty_element() {
        let mut xml = cursor(r#"<a><b/><c/></a>"#);

        xml.read().unwrap();
        xml.read().unwrap();
        assert!(xml.is_start(b"b"));
        xml.skip_to_end().unwrap();
        xml.read().unwrap();
        assert!(xml.is_start(b"c"));
    }

    #[test]
    fn test_attribute_outside_start_is_none() {
        let mut xml = cursor(r#"<a x="1">text</a>"#);

        xml.read().unwrap();
        xml.read().unwrap();
        assert_eq!(xml.kind(), NodeKind::Text);
        assert_eq!(xml.text(), "text");
        assert_eq!(xml.attribute(b"x").unwrap(), None);
    }
}
