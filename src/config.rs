//! 自動校正の設定
//!
//! JSON ファイル（キーは kebab-case）から読み込み、未指定の項目は既定値で補う。

use crate::document::Color;
use crate::error::{ConfigError, FileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 自動校正による編集を取り消し履歴にどう積むか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndoGrouping {
    /// 校正をきっかけとなった編集と同じ取り消し単位にまとめる
    #[default]
    Merged,
    /// 校正を独立した取り消し単位にする
    Separate,
}

impl UndoGrouping {
    pub fn from_str(name: &str) -> Option<Self> {
        match name {
            "merged" => Some(Self::Merged),
            "separate" => Some(Self::Separate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UndoGrouping::Merged => "merged",
            UndoGrouping::Separate => "separate",
        }
    }
}

/// 自動校正の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AutoCorrectConfig {
    /// 変更通知ごとの自動校正を行うか
    pub enabled: bool,
    /// ピリオド直後の単語に引く下線の色
    pub underline_color: Color,
    pub undo_grouping: UndoGrouping,
}

impl Default for AutoCorrectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            underline_color: Color::RED,
            undo_grouping: UndoGrouping::Merged,
        }
    }
}

impl AutoCorrectConfig {
    /// 既定の設定ファイルの場所（`<config_dir>/seisho/config.json`）
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("seisho").join("config.json"))
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 設定ファイルを読み込む
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| FileError::from_io(&e, path))?;
        Self::from_json_str(&content).map_err(|e| {
            ConfigError::InvalidFile {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// 既定の場所に設定ファイルがあれば読み込み、なければ既定値を返す
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("loading configuration from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `key=value` 形式の上書きを 1 件適用
    pub fn set_value(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "enabled" => self.enabled = value.parse().map_err(|_| invalid())?,
            "underline-color" => self.underline_color = value.parse().map_err(|_| invalid())?,
            "undo-grouping" => {
                self.undo_grouping = UndoGrouping::from_str(value).ok_or_else(invalid)?
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }
}

/// `~` や環境変数を含むパスを展開
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(err) => {
            log::warn!("could not expand path '{}': {}", raw, err);
            PathBuf::from(shellexpand::tilde(raw).as_ref())
        }
    }
}
