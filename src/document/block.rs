//! 行ブロック
//!
//! 文書を構成する 1 行分のテキストと、文字ごとに並行する書式列

use super::format::CharFormat;

/// 1 行分のテキストブロック
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineBlock {
    chars: Vec<char>,
    formats: Vec<CharFormat>,
}

impl LineBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let formats = vec![CharFormat::default(); chars.len()];
        Self { chars, formats }
    }

    /// 文字数
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn formats(&self) -> &[CharFormat] {
        &self.formats
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// 文字列と書式列から作成（長さは呼び出し側で揃える）
    pub(crate) fn from_parts(chars: Vec<char>, formats: Vec<CharFormat>) -> Self {
        debug_assert_eq!(chars.len(), formats.len());
        Self { chars, formats }
    }

    /// 別ブロックの内容を書式ごと指定位置へ差し込む
    pub(crate) fn insert(&mut self, at: usize, other: LineBlock) {
        self.chars.splice(at..at, other.chars);
        self.formats.splice(at..at, other.formats);
    }

    pub(crate) fn remove_chars(&mut self, range: std::ops::Range<usize>) -> Vec<char> {
        self.formats.drain(range.clone());
        self.chars.drain(range).collect()
    }

    /// 指定位置以降を切り離して新しいブロックとして返す
    pub(crate) fn split_off(&mut self, at: usize) -> LineBlock {
        let chars = self.chars.split_off(at);
        let formats = self.formats.split_off(at);
        LineBlock { chars, formats }
    }

    pub(crate) fn append(&mut self, mut other: LineBlock) {
        self.chars.append(&mut other.chars);
        self.formats.append(&mut other.formats);
    }

    pub(crate) fn set_char(&mut self, at: usize, ch: char) -> char {
        std::mem::replace(&mut self.chars[at], ch)
    }

    pub(crate) fn formats_mut(&mut self) -> &mut [CharFormat] {
        &mut self.formats
    }
}

/// 走査時に渡されるブロックの読み取りビュー
#[derive(Debug, Clone, Copy)]
pub struct BlockRef<'a> {
    /// 文書内のブロック番号
    pub index: usize,
    /// ブロック先頭文字の絶対オフセット
    pub start_offset: usize,
    block: &'a LineBlock,
}

impl<'a> BlockRef<'a> {
    pub(crate) fn new(index: usize, start_offset: usize, block: &'a LineBlock) -> Self {
        Self {
            index,
            start_offset,
            block,
        }
    }

    pub fn chars(&self) -> &'a [char] {
        self.block.chars()
    }

    pub fn formats(&self) -> &'a [CharFormat] {
        self.block.formats()
    }

    pub fn text(&self) -> String {
        self.block.text()
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    /// ブロックが占める絶対オフセット範囲（区切り文字は含まない）
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_offset..self.start_offset + self.block.len()
    }
}
