//! 自動校正エンジン
//!
//! 文書が変更されるたびに全ブロックを先頭から走査し、
//! 文頭の大文字化と、ピリオド直後に空白なしで続く単語への下線付けを行う。
//!
//! エンジン自身の編集も変更通知を発生させるため、リスナーとして動くときは
//! 自分の購読を [`Document::suppress`] で止めてから走査する。

pub mod scanner;

pub use scanner::{
    plan_document, scan_block, single_uppercase, BlockCorrection, CaseFix, CorrectionPlan,
    UnderlineMark,
};

use crate::config::AutoCorrectConfig;
use crate::document::{ChangeEvent, ChangeListener, CharFormat, Color, Document, ListenerId};

/// 自動校正の編集をまとめるバッチのラベル
pub const BATCH_LABEL: &str = "auto-correct";

/// 1 回の走査の集計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub blocks_scanned: usize,
    pub case_fixes: usize,
    pub flagged_runs: usize,
    pub cleared_runs: usize,
    /// 下線状態が実際に変わったブロック数
    pub blocks_reformatted: usize,
}

/// 自動校正エンジン
///
/// 走査ごとの状態は持たない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCorrectEngine {
    underline_color: Color,
}

impl AutoCorrectEngine {
    pub fn new() -> Self {
        Self {
            underline_color: Color::RED,
        }
    }

    pub fn from_config(config: &AutoCorrectConfig) -> Self {
        Self {
            underline_color: config.underline_color,
        }
    }

    pub fn underline_color(&self) -> Color {
        self.underline_color
    }

    /// 文書を変更せずに校正内容を計算
    pub fn plan(&self, document: &Document) -> CorrectionPlan {
        plan_document(document)
    }

    /// 文書全体を校正する
    ///
    /// すべての編集は 1 つのバッチとして通知される。
    pub fn run(&self, document: &mut Document) {
        let plan = self.plan(document);
        let summary = document.batch(BATCH_LABEL, |document| self.apply(document, &plan));
        log::debug!(
            "auto-correct pass: {} blocks, {} case fixes, {} flagged, {} cleared",
            summary.blocks_scanned,
            summary.case_fixes,
            summary.flagged_runs,
            summary.cleared_runs
        );
    }

    /// 計画を文書へ適用する
    ///
    /// 下線はブロックごとに一から作り直す。ブロック全体を無下線にした上で
    /// 走査順の判定を重ねた結果を一度に書き込むため、同じ文書に再適用しても
    /// 変更は発生しない。
    pub fn apply(&self, document: &mut Document, plan: &CorrectionPlan) -> PassSummary {
        let mut summary = PassSummary::default();

        for block in &plan.blocks {
            summary.blocks_scanned += 1;

            for fix in &block.case_fixes {
                match document.replace_char(fix.position, fix.to) {
                    Ok(()) => summary.case_fixes += 1,
                    Err(err) => log::warn!("skipping case fix at {}: {}", fix.position, err),
                }
            }

            let mut formats = vec![CharFormat::default(); block.range.len()];
            for mark in &block.marks {
                let range = mark.range();
                let local = range.start - block.range.start..range.end - block.range.start;
                let format = match mark {
                    UnderlineMark::Flag(_) => {
                        summary.flagged_runs += 1;
                        CharFormat::single_underline(self.underline_color)
                    }
                    UnderlineMark::Clear(_) => {
                        summary.cleared_runs += 1;
                        CharFormat::default()
                    }
                };
                formats[local].fill(format);
            }

            let before = document.notifier().events_dispatched();
            match document.restore_formats(block.range.start, &formats) {
                Ok(()) => {
                    if document.notifier().events_dispatched() != before {
                        summary.blocks_reformatted += 1;
                    }
                }
                Err(err) => log::warn!(
                    "skipping underline update for block {}: {}",
                    block.block_index,
                    err
                ),
            }
        }

        summary
    }
}

impl Default for AutoCorrectEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 変更通知で自動校正を走らせるリスナー
#[derive(Debug, Clone)]
pub struct AutoCorrectListener {
    engine: AutoCorrectEngine,
    enabled: bool,
    passes: usize,
}

impl AutoCorrectListener {
    pub fn new(config: &AutoCorrectConfig) -> Self {
        Self {
            engine: AutoCorrectEngine::from_config(config),
            enabled: config.enabled,
            passes: 0,
        }
    }

    pub fn engine(&self) -> &AutoCorrectEngine {
        &self.engine
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// これまでに走った校正の回数
    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl ChangeListener for AutoCorrectListener {
    fn on_change(&mut self, id: ListenerId, document: &mut Document, _event: &ChangeEvent) {
        if !self.enabled {
            return;
        }

        let mut document = document.suppress(id);
        self.passes += 1;
        self.engine.run(&mut document);
    }

    fn accepts_event(&self, event: &ChangeEvent) -> bool {
        event.is_edit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UnderlineStyle;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn corrected(text: &str) -> Document {
        let mut document = Document::from_text(text);
        AutoCorrectEngine::new().run(&mut document);
        document
    }

    #[test]
    fn capitalizes_after_period_with_space() {
        let document = corrected("hello. world");
        assert_eq!(document.to_text(), "Hello. World");
        assert!(document.underlined_ranges().is_empty());
    }

    #[test]
    fn underlines_word_missing_space() {
        let document = corrected("Hello.world");
        assert_eq!(document.to_text(), "Hello.World");
        assert_eq!(document.underlined_ranges(), vec![6..11]);

        let format = document.format_at(6).unwrap();
        assert_eq!(format.underline, UnderlineStyle::Single);
        assert_eq!(format.underline_color, Some(Color::RED));
    }

    #[test]
    fn underline_clears_once_space_is_inserted() {
        let mut document = corrected("Hello.world");
        document.insert_text(6, " ").unwrap();
        // 挿入された空白は既定書式、"World" には下線が残っている
        assert_eq!(document.underlined_ranges(), vec![7..12]);

        AutoCorrectEngine::new().run(&mut document);
        assert_eq!(document.to_text(), "Hello. World");
        assert!(document.underlined_ranges().is_empty());
    }

    #[test]
    fn stale_underlines_elsewhere_are_removed() {
        let mut document = Document::from_text("Plain text");
        document.set_underline(0..5, Color::RED).unwrap();
        AutoCorrectEngine::new().run(&mut document);
        assert!(document.underlined_ranges().is_empty());
    }

    #[test]
    fn capitalize_flag_crosses_blocks() {
        let document = corrected("End of line one.\nnext line");
        assert_eq!(document.to_text(), "End of line one.\nNext line");
    }

    #[test]
    fn empty_block_does_not_consume_flag() {
        let document = corrected("One.\n\n  two");
        assert_eq!(document.to_text(), "One.\n\n  Two");
        assert_eq!(document.block(1).unwrap().len(), 0);
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut document = corrected("a.b c. d\nend.start");
        let snapshot = document.clone();
        let events = document.notifier().events_dispatched();

        let summary = AutoCorrectEngine::new().apply(&mut document, &plan_document(&snapshot));
        assert_eq!(document, snapshot);
        assert_eq!(summary.blocks_reformatted, 0);
        assert_eq!(document.notifier().events_dispatched(), events);
    }

    #[test]
    fn custom_underline_color_is_used() {
        let config = AutoCorrectConfig {
            underline_color: Color::rgb(0, 0, 0xff),
            ..AutoCorrectConfig::default()
        };
        let mut document = Document::from_text("Hi.there");
        AutoCorrectEngine::from_config(&config).run(&mut document);
        assert_eq!(
            document.format_at(3).unwrap().underline_color,
            Some(Color::rgb(0, 0, 0xff))
        );
    }

    #[test]
    fn listener_runs_once_per_edit() {
        let mut document = Document::from_text("");
        let listener = Rc::new(RefCell::new(AutoCorrectListener::new(
            &AutoCorrectConfig::default(),
        )));
        let id = document.subscribe(listener.clone());

        document.insert_text(0, "hello.world").unwrap();
        assert_eq!(listener.borrow().passes(), 1);
        assert_eq!(document.to_text(), "Hello.World");
        assert!(document.is_connected(id));

        document.insert_text(11, " again").unwrap();
        assert_eq!(listener.borrow().passes(), 2);
    }

    #[test]
    fn disabled_listener_leaves_text_alone() {
        let mut document = Document::new();
        let config = AutoCorrectConfig {
            enabled: false,
            ..AutoCorrectConfig::default()
        };
        let listener = Rc::new(RefCell::new(AutoCorrectListener::new(&config)));
        document.subscribe(listener.clone());

        document.insert_text(0, "hello").unwrap();
        assert_eq!(document.to_text(), "hello");
        assert_eq!(listener.borrow().passes(), 0);
    }
}
