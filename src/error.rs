//! エラーハンドリングシステム
//!
//! seisho 全体で使用される統一されたエラー型とユーティリティを定義。
//! 自動校正の走査そのものは失敗しないため、ここに現れるのは
//! 文書操作・設定・履歴適用・入出力のエラーのみ。

use thiserror::Error;

/// アプリケーション全体のエラー型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeishoError {
    /// 文書操作エラー
    #[error("Document operation failed: {0}")]
    Document(#[from] DocumentError),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 履歴操作エラー
    #[error("History operation failed: {0}")]
    History(#[from] HistoryError),

    /// ファイル操作エラー
    #[error("File operation failed: {0}")]
    File(#[from] FileError),
}

/// 文書操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Position {position} is out of bounds (length {len})")]
    OutOfBounds { position: usize, len: usize },

    #[error("Position {position} is not inside a line block")]
    NotInBlock { position: usize },

    #[error("Expected {expected} character formats, got {actual}")]
    FormatMismatch { expected: usize, actual: usize },
}

/// 設定固有のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {path}: {message}")]
    InvalidFile { path: String, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },
}

/// 履歴操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Failed to apply history entry: {message}")]
    ApplyFailed { message: String },
}

/// ファイル操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl FileError {
    /// `std::io::Error` をパス情報付きで分類
    pub fn from_io(error: &std::io::Error, path: &std::path::Path) -> Self {
        let path = path.display().to_string();
        match error.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied { path },
            _ => FileError::Io {
                message: format!("{}: {}", path, error),
            },
        }
    }
}

// std::io::Error から SeishoError への変換
impl From<std::io::Error> for SeishoError {
    fn from(error: std::io::Error) -> Self {
        SeishoError::File(FileError::Io {
            message: error.to_string(),
        })
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse {
            message: error.to_string(),
        }
    }
}

/// プロジェクト標準のResult型
pub type Result<T> = std::result::Result<T, SeishoError>;

/// パニックハンドラの設定
pub fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .unwrap_or_else(|| std::panic::Location::caller());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s
        } else {
            "Unknown panic payload"
        };

        eprintln!("PANIC at {}:{}: {}", location.file(), location.line(), message);
        eprintln!("Stack trace: {}", std::backtrace::Backtrace::capture());

        std::process::exit(1);
    }));
}
