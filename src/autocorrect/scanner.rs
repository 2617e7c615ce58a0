//! 自動校正の走査
//!
//! 文書を変更せずに、ブロックごとの大文字化と下線の判定だけを行う。
//! 判定はテキストの分類（ピリオド・空白・文字）のみに依存するため、
//! 大文字化を適用してもオフセットや後続の判定は変わらない。

use crate::document::{BlockRef, Document};
use std::ops::Range;

/// 下線に関する判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnderlineMark {
    /// ピリオド直後に空白なしで続く単語（下線を引く）
    Flag(Range<usize>),
    /// 空白を挟んで続く単語（下線を消す）
    Clear(Range<usize>),
}

impl UnderlineMark {
    pub fn range(&self) -> &Range<usize> {
        match self {
            UnderlineMark::Flag(range) | UnderlineMark::Clear(range) => range,
        }
    }

    fn offset(self, by: usize) -> Self {
        let shift = |range: Range<usize>| range.start + by..range.end + by;
        match self {
            UnderlineMark::Flag(range) => UnderlineMark::Flag(shift(range)),
            UnderlineMark::Clear(range) => UnderlineMark::Clear(shift(range)),
        }
    }
}

/// 1 文字の大文字化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseFix {
    pub position: usize,
    pub from: char,
    pub to: char,
}

/// 1 ブロック分の校正内容（オフセットは絶対位置）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockCorrection {
    pub block_index: usize,
    /// ブロックが占める範囲（下線の全消去に使う）
    pub range: Range<usize>,
    pub case_fixes: Vec<CaseFix>,
    /// 走査順の下線判定
    pub marks: Vec<UnderlineMark>,
}

impl BlockCorrection {
    pub fn flagged(&self) -> impl Iterator<Item = &Range<usize>> {
        self.marks.iter().filter_map(|mark| match mark {
            UnderlineMark::Flag(range) => Some(range),
            UnderlineMark::Clear(_) => None,
        })
    }
}

/// 文書全体の校正計画
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrectionPlan {
    /// 空でないブロックのみ、文書順
    pub blocks: Vec<BlockCorrection>,
}

impl CorrectionPlan {
    pub fn flagged_ranges(&self) -> Vec<Range<usize>> {
        self.blocks
            .iter()
            .flat_map(|block| block.flagged().cloned())
            .collect()
    }
}

/// 長さを変えずに大文字化できる場合のみ大文字を返す
pub fn single_uppercase(ch: char) -> Option<char> {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(up), None) => Some(up),
        _ => None,
    }
}

/// 文書全体を走査して校正計画を作る
pub fn plan_document(document: &Document) -> CorrectionPlan {
    let mut capitalize_next = true;
    let blocks = document
        .blocks()
        .filter(|block| !block.is_empty())
        .map(|block| scan_block(&block, &mut capitalize_next))
        .collect();
    CorrectionPlan { blocks }
}

/// 1 ブロックを走査する
///
/// `capitalize_next` はブロックを跨いで引き継がれる。
pub fn scan_block(block: &BlockRef<'_>, capitalize_next: &mut bool) -> BlockCorrection {
    let text = block.chars();
    let base = block.start_offset;
    let mut correction = BlockCorrection {
        block_index: block.index,
        range: block.range(),
        ..BlockCorrection::default()
    };
    let fix = |column: usize, ch: char, correction: &mut BlockCorrection| {
        if let Some(upper) = single_uppercase(ch).filter(|&upper| upper != ch) {
            let position = base + column;
            if correction.case_fixes.last().map(|f| f.position) != Some(position) {
                correction.case_fixes.push(CaseFix {
                    position,
                    from: ch,
                    to: upper,
                });
            }
        }
    };

    // 行頭は状態に関係なく大文字にする
    if let Some(&first) = text.first() {
        if first.is_alphabetic() && first.is_lowercase() {
            fix(0, first, &mut correction);
        }
    }

    for (i, &ch) in text.iter().enumerate() {
        if ch == '.' {
            *capitalize_next = true;
            if let Some(&next) = text.get(i + 1) {
                let word = word_after(text, i + 1);
                if !word.is_empty() {
                    let mark = if next != ' ' {
                        UnderlineMark::Flag(word)
                    } else {
                        UnderlineMark::Clear(word)
                    };
                    correction.marks.push(mark.offset(base));
                }
            }
        } else if ch == ' ' && *capitalize_next {
            continue;
        } else if ch.is_alphabetic() && *capitalize_next {
            fix(i, ch, &mut correction);
            *capitalize_next = false;
        }
    }

    correction
}

/// `from` から空白を読み飛ばし、続く文字の連なりの範囲を返す
fn word_after(text: &[char], from: usize) -> Range<usize> {
    let start = from
        + text[from..]
            .iter()
            .take_while(|&&ch| ch == ' ')
            .count();
    let end = start
        + text[start..]
            .iter()
            .take_while(|ch| ch.is_alphabetic())
            .count();
    start..end
}
