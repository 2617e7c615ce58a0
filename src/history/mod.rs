//! 編集履歴（取り消し・やり直し）
//!
//! 文書の変更通知を記録して取り消し単位を組み立てる。バッチ内の変更は
//! 1 つの履歴エントリになる。自動校正のバッチは利用者の編集のバッチの中で
//! 発生するため、[`UndoGrouping`] に応じて外側へ併合するか独立させる。

use std::cell::RefCell;
use std::rc::Rc;

pub use crate::config::UndoGrouping;
use crate::document::{ChangeEvent, ChangeListener, CharFormat, Document, ListenerId};
use crate::error::{HistoryError, Result};

/// 記録リスナーの優先度（自動校正より先に利用者の編集を記録する）
pub const RECORDER_PRIORITY: i32 = 100;

/// 履歴操作の最小単位
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicEdit {
    /// 内容の変更。書式列は `\n` を除く各文字に対応し、戻すときに書式も復元する
    Contents {
        position: usize,
        removed: String,
        removed_formats: Vec<CharFormat>,
        added: String,
        added_formats: Vec<CharFormat>,
    },
    Format {
        position: usize,
        before: Vec<CharFormat>,
        after: Vec<CharFormat>,
    },
}

impl AtomicEdit {
    fn from_event(event: &ChangeEvent) -> Option<Self> {
        match event {
            ChangeEvent::ContentsChanged {
                position,
                removed,
                removed_formats,
                added,
                added_formats,
            } => Some(AtomicEdit::Contents {
                position: *position,
                removed: removed.clone(),
                removed_formats: removed_formats.clone(),
                added: added.clone(),
                added_formats: added_formats.clone(),
            }),
            ChangeEvent::FormatChanged {
                position,
                before,
                after,
            } => Some(AtomicEdit::Format {
                position: *position,
                before: before.clone(),
                after: after.clone(),
            }),
            ChangeEvent::BatchStart { .. } | ChangeEvent::BatchEnd { .. } => None,
        }
    }

    fn revert(&self, document: &mut Document) -> Result<()> {
        match self {
            AtomicEdit::Contents {
                position,
                removed,
                removed_formats,
                added,
                ..
            } => {
                document.remove_text(*position, added.chars().count())?;
                document.insert_formatted(*position, removed, removed_formats)
            }
            AtomicEdit::Format {
                position, before, ..
            } => document.restore_formats(*position, before),
        }
    }

    fn reapply(&self, document: &mut Document) -> Result<()> {
        match self {
            AtomicEdit::Contents {
                position,
                removed,
                added,
                added_formats,
                ..
            } => {
                document.remove_text(*position, removed.chars().count())?;
                document.insert_formatted(*position, added, added_formats)
            }
            AtomicEdit::Format {
                position, after, ..
            } => document.restore_formats(*position, after),
        }
    }
}

/// 履歴エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// エントリを作ったバッチのラベル（バッチ外の変更は "edit"）
    pub label: String,
    pub operations: Vec<AtomicEdit>,
}

impl HistoryEntry {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            operations: Vec::new(),
        }
    }

    fn undo(&self, document: &mut Document) -> Result<()> {
        for operation in self.operations.iter().rev() {
            operation.revert(document)?;
        }
        Ok(())
    }

    fn redo(&self, document: &mut Document) -> Result<()> {
        for operation in &self.operations {
            operation.reapply(document)?;
        }
        Ok(())
    }
}

/// 編集履歴スタック
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo.last()
    }

    pub fn take_for_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop()
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    pub fn take_for_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    pub fn push_without_clearing(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// 変更通知から履歴エントリを組み立てる記録器
#[derive(Debug)]
pub struct HistoryRecorder {
    grouping: UndoGrouping,
    /// 開いているバッチのラベル（外側から順）
    open_batches: Vec<String>,
    current: Option<HistoryEntry>,
    stack: HistoryStack,
}

impl HistoryRecorder {
    pub fn new(grouping: UndoGrouping) -> Self {
        Self {
            grouping,
            open_batches: Vec::new(),
            current: None,
            stack: HistoryStack::new(),
        }
    }

    fn flush(&mut self) {
        if let Some(entry) = self.current.take() {
            if !entry.operations.is_empty() {
                self.stack.push(entry);
            }
        }
    }

    fn on_batch_start(&mut self, label: &str) {
        match self.grouping {
            UndoGrouping::Merged => {
                if self.open_batches.is_empty() {
                    self.current = Some(HistoryEntry::new(label));
                }
            }
            UndoGrouping::Separate => {
                self.flush();
                self.current = Some(HistoryEntry::new(label));
            }
        }
        self.open_batches.push(label.to_string());
    }

    fn on_batch_end(&mut self) {
        self.open_batches.pop();
        match self.grouping {
            UndoGrouping::Merged => {
                if self.open_batches.is_empty() {
                    self.flush();
                }
            }
            UndoGrouping::Separate => {
                self.flush();
                // 外側のバッチの残りは別エントリとして続ける
                if let Some(outer) = self.open_batches.last() {
                    self.current = Some(HistoryEntry::new(outer));
                }
            }
        }
    }

    fn on_edit(&mut self, operation: AtomicEdit) {
        match self.current.as_mut() {
            Some(entry) => entry.operations.push(operation),
            None => {
                let mut entry = HistoryEntry::new("edit");
                entry.operations.push(operation);
                self.stack.push(entry);
            }
        }
    }
}

impl ChangeListener for HistoryRecorder {
    fn on_change(&mut self, _id: ListenerId, _document: &mut Document, event: &ChangeEvent) {
        match event {
            ChangeEvent::BatchStart { label } => self.on_batch_start(label),
            ChangeEvent::BatchEnd { .. } => self.on_batch_end(),
            _ => {
                if let Some(operation) = AtomicEdit::from_event(event) {
                    self.on_edit(operation);
                }
            }
        }
    }

    fn priority(&self) -> i32 {
        RECORDER_PRIORITY
    }
}

/// 履歴管理
///
/// 記録器を文書へ登録し、取り消し・やり直しの適用中は記録を止める。
#[derive(Debug)]
pub struct HistoryManager {
    recorder: Rc<RefCell<HistoryRecorder>>,
    listener_id: ListenerId,
}

impl HistoryManager {
    /// 記録器を作成して文書へ登録
    pub fn attach(document: &mut Document, grouping: UndoGrouping) -> Self {
        let recorder = Rc::new(RefCell::new(HistoryRecorder::new(grouping)));
        let listener_id = document.subscribe(recorder.clone());
        Self {
            recorder,
            listener_id,
        }
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn can_undo(&self) -> bool {
        self.recorder.borrow().stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.recorder.borrow().stack.can_redo()
    }

    pub fn undo_len(&self) -> usize {
        self.recorder.borrow().stack.undo_len()
    }

    /// 次に取り消されるエントリのラベル
    pub fn next_undo_label(&self) -> Option<String> {
        self.recorder
            .borrow()
            .stack
            .peek_undo()
            .map(|entry| entry.label.clone())
    }

    pub fn clear(&mut self) {
        let mut recorder = self.recorder.borrow_mut();
        recorder.stack.clear();
        recorder.current = None;
        recorder.open_batches.clear();
    }

    pub fn undo(&mut self, document: &mut Document) -> Result<bool> {
        let Some(entry) = self.recorder.borrow_mut().stack.take_for_undo() else {
            return Ok(false);
        };
        let result = entry.undo(&mut document.suppress(self.listener_id));
        let mut recorder = self.recorder.borrow_mut();
        match result {
            Ok(()) => {
                recorder.stack.push_redo(entry);
                Ok(true)
            }
            Err(err) => {
                log::error!("undo of '{}' failed: {}", entry.label, err);
                recorder.stack.push_without_clearing(entry);
                Err(HistoryError::ApplyFailed {
                    message: err.to_string(),
                }
                .into())
            }
        }
    }

    pub fn redo(&mut self, document: &mut Document) -> Result<bool> {
        let Some(entry) = self.recorder.borrow_mut().stack.take_for_redo() else {
            return Ok(false);
        };
        let result = entry.redo(&mut document.suppress(self.listener_id));
        let mut recorder = self.recorder.borrow_mut();
        match result {
            Ok(()) => {
                recorder.stack.push_without_clearing(entry);
                Ok(true)
            }
            Err(err) => {
                log::error!("redo of '{}' failed: {}", entry.label, err);
                recorder.stack.push_redo(entry);
                Err(HistoryError::ApplyFailed {
                    message: err.to_string(),
                }
                .into())
            }
        }
    }
}
