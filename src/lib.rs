//! seisho - 自動校正付きテキストエディタのコア
//!
//! 文書が変更されるたびに文頭を大文字化し、ピリオドの直後に空白なしで
//! 続く単語へ赤い下線を引く。

// コアモジュール
pub mod config;
pub mod error;
pub mod logging;

// データ層
pub mod document;

// 校正・編集層
pub mod autocorrect;
pub mod history;
pub mod session;

// 表示層
pub mod render;

// 公開API
pub use autocorrect::{AutoCorrectEngine, AutoCorrectListener, CorrectionPlan, PassSummary};
pub use config::{AutoCorrectConfig, UndoGrouping};
pub use document::{CharFormat, Color, Document, UnderlineStyle};
pub use error::{Result, SeishoError};
pub use session::EditorSession;
