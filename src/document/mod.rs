//! 文書モデル
//!
//! 行ブロックの並びとして文書を保持する。位置はすべて文字単位の
//! 絶対オフセットで、ブロック間の区切り（改行）も 1 文字として数える。

pub mod block;
pub mod change;
pub mod format;

pub use block::{BlockRef, LineBlock};
pub use change::{
    ChangeEvent, ChangeListener, ChangeNotifier, ListenerId, NotificationGuard, SharedListener,
};
pub use format::{CharFormat, Color, ParseColorError, UnderlineStyle};

use crate::error::{DocumentError, Result};
use std::ops::Range;

/// 行ブロックで構成される文書
#[derive(Debug)]
pub struct Document {
    /// 常に 1 つ以上のブロックを持つ
    blocks: Vec<LineBlock>,
    notifier: ChangeNotifier,
}

impl Document {
    /// 空の文書を作成
    pub fn new() -> Self {
        Self {
            blocks: vec![LineBlock::new()],
            notifier: ChangeNotifier::new(),
        }
    }

    /// テキストから文書を作成（`\n` でブロックに分割）
    pub fn from_text(text: &str) -> Self {
        Self {
            blocks: text.split('\n').map(LineBlock::from_str).collect(),
            notifier: ChangeNotifier::new(),
        }
    }

    /// 文書全体をプレーンテキストとして取得
    pub fn to_text(&self) -> String {
        let lines: Vec<String> = self.blocks.iter().map(LineBlock::text).collect();
        lines.join("\n")
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// 区切り文字を含めた総文字数
    pub fn len_chars(&self) -> usize {
        let text: usize = self.blocks.iter().map(LineBlock::len).sum();
        text + self.blocks.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// ブロックを先頭から順に列挙
    pub fn blocks(&self) -> impl Iterator<Item = BlockRef<'_>> + '_ {
        let mut offset = 0;
        self.blocks.iter().enumerate().map(move |(index, block)| {
            let start_offset = offset;
            offset += block.len() + 1;
            BlockRef::new(index, start_offset, block)
        })
    }

    pub fn block(&self, index: usize) -> Option<BlockRef<'_>> {
        self.blocks().nth(index)
    }

    /// 絶対位置を（ブロック番号, ブロック内位置）へ変換
    ///
    /// ブロック末尾（区切り文字の位置）も有効な位置として扱う。
    pub fn locate(&self, position: usize) -> Result<(usize, usize)> {
        let mut start = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            if position <= start + block.len() {
                return Ok((index, position - start));
            }
            start += block.len() + 1;
        }
        Err(DocumentError::OutOfBounds {
            position,
            len: self.len_chars(),
        }
        .into())
    }

    /// 指定位置の文字（区切り位置では `\n`）
    pub fn char_at(&self, position: usize) -> Option<char> {
        let (index, column) = self.locate(position).ok()?;
        let block = &self.blocks[index];
        if column < block.len() {
            Some(block.chars()[column])
        } else if index + 1 < self.blocks.len() {
            Some('\n')
        } else {
            None
        }
    }

    /// 指定位置の書式（区切り位置と文書末尾では `None`）
    pub fn format_at(&self, position: usize) -> Option<CharFormat> {
        let (index, column) = self.locate(position).ok()?;
        self.blocks[index].formats().get(column).copied()
    }

    /// 範囲内のテキストを取得
    pub fn text_range(&self, range: Range<usize>) -> Result<String> {
        self.check_range(&range)?;
        Ok(range.filter_map(|position| self.char_at(position)).collect())
    }

    /// 下線が引かれている連続範囲（絶対オフセット）を列挙
    pub fn underlined_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        for block in self.blocks() {
            let mut run_start: Option<usize> = None;
            for (column, format) in block.formats().iter().enumerate() {
                match (format.is_underlined(), run_start) {
                    (true, None) => run_start = Some(column),
                    (false, Some(start)) => {
                        ranges.push(block.start_offset + start..block.start_offset + column);
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = run_start {
                ranges.push(block.start_offset + start..block.start_offset + block.len());
            }
        }
        ranges
    }

    /// テキストを挿入（`\n` を含む場合はブロックを分割）
    pub fn insert_text(&mut self, position: usize, text: &str) -> Result<()> {
        let count = text.chars().filter(|&ch| ch != '\n').count();
        self.insert_formatted(position, text, &vec![CharFormat::default(); count])
    }

    /// 書式付きでテキストを挿入
    ///
    /// `formats` は `\n` を除いた各文字の書式。
    pub fn insert_formatted(
        &mut self,
        position: usize,
        text: &str,
        formats: &[CharFormat],
    ) -> Result<()> {
        let expected = text.chars().filter(|&ch| ch != '\n').count();
        if formats.len() != expected {
            return Err(DocumentError::FormatMismatch {
                expected,
                actual: formats.len(),
            }
            .into());
        }
        if text.is_empty() {
            return Ok(());
        }
        let (index, column) = self.locate(position)?;

        let mut offset = 0;
        let mut pieces: Vec<LineBlock> = text
            .split('\n')
            .map(|segment| {
                let chars: Vec<char> = segment.chars().collect();
                let end = offset + chars.len();
                let piece = LineBlock::from_parts(chars, formats[offset..end].to_vec());
                offset = end;
                piece
            })
            .collect();
        let first = pieces.remove(0);

        if pieces.is_empty() {
            self.blocks[index].insert(column, first);
        } else {
            let tail = self.blocks[index].split_off(column);
            self.blocks[index].append(first);
            if let Some(last) = pieces.last_mut() {
                last.append(tail);
            }
            let at = index + 1;
            self.blocks.splice(at..at, pieces);
        }

        self.emit(ChangeEvent::ContentsChanged {
            position,
            removed: String::new(),
            removed_formats: Vec::new(),
            added: text.to_string(),
            added_formats: formats.to_vec(),
        });
        Ok(())
    }

    /// 範囲を削除し、削除したテキストを返す（区切りを跨ぐとブロックを結合）
    pub fn remove_text(&mut self, position: usize, len: usize) -> Result<String> {
        if len == 0 {
            return Ok(String::new());
        }
        let range = position..position + len;
        let removed = self.text_range(range.clone())?;
        let removed_formats: Vec<CharFormat> = range
            .clone()
            .filter_map(|position| self.format_at(position))
            .collect();

        let (first, first_column) = self.locate(range.start)?;
        let (last, last_column) = self.locate(range.end)?;

        if first == last {
            self.blocks[first].remove_chars(first_column..last_column);
        } else {
            let first_len = self.blocks[first].len();
            self.blocks[first].remove_chars(first_column..first_len);
            let tail = self.blocks[last].split_off(last_column);
            self.blocks.drain(first + 1..=last);
            self.blocks[first].append(tail);
        }

        self.emit(ChangeEvent::ContentsChanged {
            position,
            removed: removed.clone(),
            removed_formats,
            added: String::new(),
            added_formats: Vec::new(),
        });
        Ok(removed)
    }

    /// 1 文字を同じ長さのまま置き換える
    pub fn replace_char(&mut self, position: usize, ch: char) -> Result<()> {
        if ch == '\n' {
            return Err(DocumentError::NotInBlock { position }.into());
        }
        let (index, column) = self.locate(position)?;
        let block = &mut self.blocks[index];
        if column >= block.len() {
            return Err(DocumentError::NotInBlock { position }.into());
        }
        if block.chars()[column] == ch {
            return Ok(());
        }

        let format = block.formats()[column];
        let old = block.set_char(column, ch);
        self.emit(ChangeEvent::ContentsChanged {
            position,
            removed: old.to_string(),
            removed_formats: vec![format],
            added: ch.to_string(),
            added_formats: vec![format],
        });
        Ok(())
    }

    /// 範囲内の全文字に書式を設定（区切り文字は無視）
    pub fn set_char_format(&mut self, range: Range<usize>, format: CharFormat) -> Result<()> {
        self.check_range(&range)?;
        let segments: Vec<(usize, Range<usize>)> = self
            .blocks()
            .filter_map(|block| {
                let start = range.start.max(block.start_offset);
                let end = range.end.min(block.start_offset + block.len());
                if start >= end {
                    return None;
                }
                Some((block.index, start - block.start_offset..end - block.start_offset))
            })
            .collect();

        for (index, columns) in segments {
            let formats = vec![format; columns.len()];
            self.write_formats(index, columns.start, &formats);
        }
        Ok(())
    }

    /// 赤などの指定色で一重下線を引く
    pub fn set_underline(&mut self, range: Range<usize>, color: Color) -> Result<()> {
        self.set_char_format(range, CharFormat::single_underline(color))
    }

    /// 範囲の下線を消す
    pub fn clear_underline(&mut self, range: Range<usize>) -> Result<()> {
        self.set_char_format(range, CharFormat::default())
    }

    /// 位置から始まる書式列をそのまま書き戻す（単一ブロック内）
    pub fn restore_formats(&mut self, position: usize, formats: &[CharFormat]) -> Result<()> {
        let (index, column) = self.locate(position)?;
        if column + formats.len() > self.blocks[index].len() {
            return Err(DocumentError::NotInBlock {
                position: position + formats.len(),
            }
            .into());
        }
        self.write_formats(index, column, formats);
        Ok(())
    }

    /// バッチ操作開始を通知
    pub fn begin_batch(&mut self, label: &str) {
        self.emit(ChangeEvent::BatchStart {
            label: label.to_string(),
        });
    }

    /// バッチ操作終了を通知
    pub fn end_batch(&mut self, label: &str) {
        self.emit(ChangeEvent::BatchEnd {
            label: label.to_string(),
        });
    }

    /// クロージャ内の変更を 1 つのバッチとして通知
    pub fn batch<T>(&mut self, label: &str, operation: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_batch(label);
        let result = operation(self);
        self.end_batch(label);
        result
    }

    fn write_formats(&mut self, index: usize, column: usize, formats: &[CharFormat]) {
        let slot = &mut self.blocks[index].formats_mut()[column..column + formats.len()];
        if *slot == *formats {
            return;
        }
        let before = slot.to_vec();
        slot.copy_from_slice(formats);

        let position = self
            .block(index)
            .map(|block| block.start_offset + column)
            .unwrap_or_default();
        self.emit(ChangeEvent::FormatChanged {
            position,
            before,
            after: formats.to_vec(),
        });
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(DocumentError::OutOfBounds {
                position: range.end.max(range.start),
                len,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    /// テキストと書式のみを複製する（リスナーは引き継がない）
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            notifier: ChangeNotifier::new(),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}

impl Eq for Document {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct EventLog(Rc<RefCell<Vec<ChangeEvent>>>);

    impl ChangeListener for EventLog {
        fn on_change(&mut self, _id: ListenerId, _document: &mut Document, event: &ChangeEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn block_offsets_count_separators() {
        let document = Document::from_text("ab\n\ncde");
        let offsets: Vec<usize> = document.blocks().map(|b| b.start_offset).collect();
        assert_eq!(offsets, vec![0, 3, 4]);
        assert_eq!(document.len_chars(), 7);
        assert_eq!(document.char_at(2), Some('\n'));
        assert_eq!(document.char_at(6), Some('e'));
        assert_eq!(document.char_at(7), None);
    }

    #[test]
    fn empty_document_has_one_block() {
        let document = Document::new();
        assert_eq!(document.block_count(), 1);
        assert!(document.is_empty());
        assert_eq!(document.to_text(), "");
    }

    #[test]
    fn insert_text_splits_blocks() {
        let mut document = Document::from_text("helloworld");
        document.insert_text(5, "!\nnew\n").unwrap();
        assert_eq!(document.to_text(), "hello!\nnew\nworld");
        assert_eq!(document.block_count(), 3);
    }

    #[test]
    fn remove_text_merges_blocks() {
        let mut document = Document::from_text("one\ntwo\nthree");
        let removed = document.remove_text(2, 7).unwrap();
        assert_eq!(removed, "e\ntwo\nt");
        assert_eq!(document.to_text(), "onhree");
        assert_eq!(document.block_count(), 1);
    }

    #[test]
    fn insert_formatted_spreads_formats_across_blocks() {
        let underline = CharFormat::single_underline(Color::RED);
        let plain = CharFormat::default();
        let mut document = Document::from_text("ad");
        document
            .insert_formatted(1, "b\nc", &[underline, underline])
            .unwrap();
        assert_eq!(document.to_text(), "ab\ncd");
        assert_eq!(document.underlined_ranges(), vec![1..2, 3..4]);

        assert!(document.insert_formatted(0, "xy", &[plain]).is_err());
        assert_eq!(document.to_text(), "ab\ncd");
    }

    #[test]
    fn remove_text_reports_removed_formats() {
        let mut document = Document::from_text("ab\ncd");
        document.set_underline(1..4, Color::RED).unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        document.subscribe(Rc::new(RefCell::new(EventLog(events.clone()))));

        document.remove_text(1, 3).unwrap();
        let underline = CharFormat::single_underline(Color::RED);
        assert_eq!(
            events.borrow().last(),
            Some(&ChangeEvent::ContentsChanged {
                position: 1,
                removed: "b\nc".to_string(),
                removed_formats: vec![underline, underline],
                added: String::new(),
                added_formats: Vec::new(),
            })
        );
    }

    #[test]
    fn out_of_range_positions_are_rejected() {
        let mut document = Document::from_text("abc");
        assert!(document.insert_text(4, "x").is_err());
        assert!(document.remove_text(2, 5).is_err());
        assert!(document.replace_char(3, 'x').is_err());
        assert!(document.set_underline(0..9, Color::RED).is_err());
    }

    #[test]
    fn formats_skip_block_separators() {
        let mut document = Document::from_text("ab\ncd");
        document.set_underline(1..4, Color::RED).unwrap();
        assert_eq!(document.underlined_ranges(), vec![1..2, 3..4]);
        assert_eq!(document.format_at(2), None);

        document.clear_underline(0..5).unwrap();
        assert!(document.underlined_ranges().is_empty());
    }

    #[test]
    fn replace_char_keeps_length() {
        let mut document = Document::from_text("abc");
        document.replace_char(1, 'B').unwrap();
        assert_eq!(document.to_text(), "aBc");
        assert_eq!(document.len_chars(), 3);
    }

    #[test]
    fn no_op_edits_emit_nothing() {
        let mut document = Document::from_text("abc");
        document.replace_char(0, 'a').unwrap();
        document.clear_underline(0..3).unwrap();
        document.insert_text(0, "").unwrap();
        assert_eq!(document.notifier().events_dispatched(), 0);

        document.replace_char(0, 'A').unwrap();
        assert_eq!(document.notifier().events_dispatched(), 1);
    }

    #[test]
    fn clone_compares_content_only() {
        let mut document = Document::from_text("abc");
        document.set_underline(0..1, Color::RED).unwrap();
        let copy = document.clone();
        assert_eq!(copy, document);
        assert_eq!(copy.notifier().listener_count(), 0);
    }
}
