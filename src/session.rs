//! 編集セッション
//!
//! 文書・履歴・自動校正リスナーを束ねるホスト。利用者の編集は
//! バッチとして文書へ適用され、その変更通知で自動校正が走る。

use std::cell::RefCell;
use std::rc::Rc;

use crate::autocorrect::AutoCorrectListener;
use crate::config::AutoCorrectConfig;
use crate::document::{Document, ListenerId};
use crate::error::Result;
use crate::history::HistoryManager;

/// 利用者の挿入を表すバッチのラベル
pub const INSERT_LABEL: &str = "insert";
/// 利用者の削除を表すバッチのラベル
pub const DELETE_LABEL: &str = "delete";

/// 自動校正付きの編集セッション
#[derive(Debug)]
pub struct EditorSession {
    document: Document,
    history: HistoryManager,
    autocorrect: Rc<RefCell<AutoCorrectListener>>,
    autocorrect_id: ListenerId,
    config: AutoCorrectConfig,
}

impl EditorSession {
    /// 空の文書でセッションを開始
    pub fn new(config: AutoCorrectConfig) -> Self {
        Self::with_document(Document::new(), config)
    }

    /// テキストを読み込んでセッションを開始
    ///
    /// 読み込み直後に一度校正を行い、その編集は履歴に残さない。
    pub fn with_text(text: &str, config: AutoCorrectConfig) -> Self {
        let mut session = Self::with_document(Document::from_text(text), config);
        if session.config.enabled {
            session.autocorrect_now();
        }
        session.history.clear();
        session
    }

    fn with_document(mut document: Document, config: AutoCorrectConfig) -> Self {
        // 記録器は自動校正より優先度が高く、利用者の編集を先に記録する
        let history = HistoryManager::attach(&mut document, config.undo_grouping);
        let autocorrect = Rc::new(RefCell::new(AutoCorrectListener::new(&config)));
        let autocorrect_id = document.subscribe(autocorrect.clone());

        log::debug!(
            "editor session started (auto-correct {}, undo grouping {})",
            if config.enabled { "on" } else { "off" },
            config.undo_grouping.as_str()
        );

        Self {
            document,
            history,
            autocorrect,
            autocorrect_id,
            config,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.to_text()
    }

    pub fn config(&self) -> &AutoCorrectConfig {
        &self.config
    }

    /// 変更通知で走った自動校正の回数
    pub fn autocorrect_passes(&self) -> usize {
        self.autocorrect.borrow().passes()
    }

    pub fn set_autocorrect_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        self.autocorrect.borrow_mut().set_enabled(enabled);
    }

    /// 位置にテキストを挿入
    pub fn insert(&mut self, position: usize, text: &str) -> Result<()> {
        self.document
            .batch(INSERT_LABEL, |document| document.insert_text(position, text))
    }

    /// 文書末尾にテキストを入力
    pub fn type_text(&mut self, text: &str) -> Result<()> {
        let end = self.document.len_chars();
        self.insert(end, text)
    }

    /// 範囲を削除して削除したテキストを返す
    pub fn remove(&mut self, position: usize, len: usize) -> Result<String> {
        self.document
            .batch(DELETE_LABEL, |document| document.remove_text(position, len))
    }

    /// 文書を空にして履歴も破棄する
    pub fn clear(&mut self) -> Result<()> {
        let len = self.document.len_chars();
        self.document.remove_text(0, len)?;
        self.history.clear();
        Ok(())
    }

    /// 変更通知を待たずに校正を実行（有効・無効の設定に関係なく走る）
    pub fn autocorrect_now(&mut self) {
        let engine = *self.autocorrect.borrow().engine();
        let mut document = self.document.suppress(self.autocorrect_id);
        engine.run(&mut document);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// 直前の取り消し単位を元に戻す
    ///
    /// 適用中は自動校正を止め、戻した内容がすぐ再校正されないようにする。
    pub fn undo(&mut self) -> Result<bool> {
        let mut document = self.document.suppress(self.autocorrect_id);
        self.history.undo(&mut document)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let mut document = self.document.suppress(self.autocorrect_id);
        self.history.redo(&mut document)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(AutoCorrectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_text_corrects_without_history() {
        let session = EditorSession::with_text("hello.world", AutoCorrectConfig::default());
        assert_eq!(session.text(), "Hello.World");
        assert!(!session.can_undo());
        assert_eq!(session.autocorrect_passes(), 0);
    }

    #[test]
    fn clear_resets_document_and_history() {
        let mut session = EditorSession::default();
        session.type_text("some text").unwrap();
        session.clear().unwrap();
        assert_eq!(session.text(), "");
        assert!(!session.can_undo());
    }

    #[test]
    fn disabling_autocorrect_stops_passes() {
        let mut session = EditorSession::default();
        session.set_autocorrect_enabled(false);
        session.type_text("lower").unwrap();
        assert_eq!(session.text(), "lower");

        session.autocorrect_now();
        assert_eq!(session.text(), "Lower");
    }
}
