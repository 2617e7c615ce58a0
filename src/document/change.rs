//! 変更通知システム
//!
//! 文書の変更イベントを優先度順にリスナーへ配信する。
//! リスナーは自身の購読をスコープ付きで一時停止でき、
//! 自分が発生させた変更で再帰的に呼び出されることを防ぐ。

use super::format::CharFormat;
use super::Document;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// リスナーの一意識別子
pub type ListenerId = usize;

/// 変更イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// テキスト内容の変更（挿入・削除・置換）
    ///
    /// 書式列は区切り文字を除いた各文字に対応する。
    ContentsChanged {
        position: usize,
        removed: String,
        removed_formats: Vec<CharFormat>,
        added: String,
        added_formats: Vec<CharFormat>,
    },

    /// 書式の変更（単一ブロック内の連続範囲）
    FormatChanged {
        position: usize,
        before: Vec<CharFormat>,
        after: Vec<CharFormat>,
    },

    /// バッチ操作開始
    BatchStart { label: String },

    /// バッチ操作終了
    BatchEnd { label: String },
}

impl ChangeEvent {
    /// 文書の内容または書式を実際に変更したイベントか
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            ChangeEvent::ContentsChanged { .. } | ChangeEvent::FormatChanged { .. }
        )
    }
}

/// 変更通知リスナー
pub trait ChangeListener {
    /// 変更イベントを処理
    ///
    /// `id` は購読時に割り当てられた自身の識別子。
    fn on_change(&mut self, id: ListenerId, document: &mut Document, event: &ChangeEvent);

    /// リスナーの優先度を返す（高い値ほど先に呼ばれる）
    fn priority(&self) -> i32 {
        0
    }

    /// 特定のイベント種別のみを処理するかどうか
    fn accepts_event(&self, event: &ChangeEvent) -> bool {
        let _ = event;
        true
    }
}

/// 共有リスナーハンドル
pub type SharedListener = Rc<RefCell<dyn ChangeListener>>;

struct Subscription {
    id: ListenerId,
    priority: i32,
    connected: bool,
    listener: SharedListener,
}

/// 購読管理と配信統計
#[derive(Default)]
pub struct ChangeNotifier {
    subscriptions: Vec<Subscription>,
    next_id: ListenerId,
    events_dispatched: usize,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// リスナーを登録する。優先度の降順、同順位は登録順に並ぶ
    pub fn subscribe(&mut self, listener: SharedListener) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;

        let priority = listener.borrow().priority();
        let at = self
            .subscriptions
            .iter()
            .position(|sub| sub.priority < priority)
            .unwrap_or(self.subscriptions.len());

        self.subscriptions.insert(
            at,
            Subscription {
                id,
                priority,
                connected: true,
                listener,
            },
        );
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    pub fn is_connected(&self, id: ListenerId) -> bool {
        self.subscriptions
            .iter()
            .any(|sub| sub.id == id && sub.connected)
    }

    /// 接続状態を変更し、変更前の状態を返す
    fn set_connected(&mut self, id: ListenerId, connected: bool) -> bool {
        match self.subscriptions.iter_mut().find(|sub| sub.id == id) {
            Some(sub) => std::mem::replace(&mut sub.connected, connected),
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn events_dispatched(&self) -> usize {
        self.events_dispatched
    }

    fn connected_listeners(&self) -> Vec<(ListenerId, SharedListener)> {
        self.subscriptions
            .iter()
            .filter(|sub| sub.connected)
            .map(|sub| (sub.id, Rc::clone(&sub.listener)))
            .collect()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.subscriptions.len())
            .field("events_dispatched", &self.events_dispatched)
            .finish()
    }
}

impl Document {
    /// リスナーを登録
    pub fn subscribe(&mut self, listener: SharedListener) -> ListenerId {
        self.notifier.subscribe(listener)
    }

    /// リスナーを削除
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn is_connected(&self, id: ListenerId) -> bool {
        self.notifier.is_connected(id)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// 指定リスナーへの通知をガードが生きている間だけ停止する
    ///
    /// ガードは文書への可変参照として振る舞い、破棄時（早期リターンや
    /// パニックによる巻き戻しを含む）に元の接続状態へ戻す。
    pub fn suppress(&mut self, id: ListenerId) -> NotificationGuard<'_> {
        let was_connected = self.notifier.set_connected(id, false);
        NotificationGuard {
            document: self,
            id,
            was_connected,
        }
    }

    /// 接続中のリスナーへイベントを配信
    pub(crate) fn emit(&mut self, event: ChangeEvent) {
        self.notifier.events_dispatched += 1;

        for (id, listener) in self.notifier.connected_listeners() {
            // 先に呼ばれたリスナーが購読を止めた可能性がある
            if !self.notifier.is_connected(id) {
                continue;
            }

            let Ok(mut listener) = listener.try_borrow_mut() else {
                log::error!(
                    "change listener {} re-entered while still handling an event; dropping {:?}",
                    id,
                    event
                );
                continue;
            };

            if listener.accepts_event(&event) {
                listener.on_change(id, self, &event);
            }
        }
    }
}

/// 通知停止ガード
pub struct NotificationGuard<'a> {
    document: &'a mut Document,
    id: ListenerId,
    was_connected: bool,
}

impl NotificationGuard<'_> {
    pub fn listener_id(&self) -> ListenerId {
        self.id
    }
}

impl Deref for NotificationGuard<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for NotificationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for NotificationGuard<'_> {
    fn drop(&mut self) {
        if self.was_connected {
            self.document.notifier.set_connected(self.id, true);
        }
    }
}

impl fmt::Debug for NotificationGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationGuard")
            .field("id", &self.id)
            .field("was_connected", &self.was_connected)
            .finish()
    }
}

/// テスト用リスナー
#[cfg(test)]
pub(crate) struct RecordingListener {
    pub events: Vec<ChangeEvent>,
    pub priority: i32,
    pub log: Option<Rc<RefCell<Vec<&'static str>>>>,
    pub name: &'static str,
}

#[cfg(test)]
impl RecordingListener {
    pub fn new(priority: i32) -> Self {
        Self {
            events: Vec::new(),
            priority,
            log: None,
            name: "",
        }
    }
}

#[cfg(test)]
impl ChangeListener for RecordingListener {
    fn on_change(&mut self, _id: ListenerId, _document: &mut Document, event: &ChangeEvent) {
        self.events.push(event.clone());
        if let Some(log) = &self.log {
            log.borrow_mut().push(self.name);
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(listener: RecordingListener) -> Rc<RefCell<RecordingListener>> {
        Rc::new(RefCell::new(listener))
    }

    #[test]
    fn listeners_run_in_priority_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut document = Document::from_text("abc");

        let mut low = RecordingListener::new(1);
        low.name = "low";
        low.log = Some(Rc::clone(&order));
        let mut high = RecordingListener::new(100);
        high.name = "high";
        high.log = Some(Rc::clone(&order));
        let mut mid = RecordingListener::new(1);
        mid.name = "mid";
        mid.log = Some(Rc::clone(&order));

        document.subscribe(shared(low));
        document.subscribe(shared(high));
        document.subscribe(shared(mid));

        document.insert_text(0, "x").unwrap();
        assert_eq!(*order.borrow(), vec!["high", "low", "mid"]);
    }

    #[test]
    fn suppress_guard_blocks_and_restores() {
        let mut document = Document::from_text("abc");
        let listener = shared(RecordingListener::new(0));
        let id = document.subscribe(listener.clone());

        {
            let mut guard = document.suppress(id);
            guard.insert_text(0, "x").unwrap();
            assert!(!guard.is_connected(id));
        }
        assert!(document.is_connected(id));
        assert!(listener.borrow().events.is_empty());

        document.insert_text(0, "y").unwrap();
        assert_eq!(listener.borrow().events.len(), 1);
    }

    #[test]
    fn nested_guard_keeps_outer_suppression() {
        let mut document = Document::from_text("abc");
        let id = document.subscribe(shared(RecordingListener::new(0)));

        let mut outer = document.suppress(id);
        {
            let inner = outer.suppress(id);
            drop(inner);
        }
        assert!(!outer.is_connected(id));
        drop(outer);
        assert!(document.is_connected(id));
    }

    #[test]
    fn guard_reconnects_after_panic() {
        let mut document = Document::from_text("abc");
        let id = document.subscribe(shared(RecordingListener::new(0)));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = document.suppress(id);
            panic!("scan failed");
        }));
        assert!(result.is_err());
        assert!(document.is_connected(id));
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let mut document = Document::new();
        let id = document.subscribe(shared(RecordingListener::new(0)));
        assert_eq!(document.notifier().listener_count(), 1);
        assert!(document.unsubscribe(id));
        assert!(!document.unsubscribe(id));
        assert_eq!(document.notifier().listener_count(), 0);
    }
}
