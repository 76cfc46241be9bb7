//! 設定
//!
//! メニューツリー、レイアウト、キーバインド、履歴、最近使ったファイルの設定を
//! JSON から読み込む。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::editor::history::DEFAULT_HISTORY_LIMIT;
use crate::error::ConfigError;
use crate::menu::{KeybindingChange, MenuNode};

/// 組み込みの既定設定
const BUILTIN_CONFIG: &str = include_str!("../resources/default_config.json");

pub const DEFAULT_RECENT_MAX: usize = 10;

/// レイアウト（ID の並び。`separator` は区切り線）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub toolbar: Vec<String>,
    #[serde(default)]
    pub edit_popup: Vec<String>,
    #[serde(default)]
    pub tab_popup: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// 最近使ったファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentConfig {
    /// 項目を差し込むメニューID
    #[serde(default = "default_recent_sub_root")]
    pub sub_root: String,
    #[serde(default = "default_recent_max")]
    pub max: usize,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            sub_root: default_recent_sub_root(),
            max: DEFAULT_RECENT_MAX,
        }
    }
}

fn default_recent_sub_root() -> String {
    "file.recent".to_string()
}

fn default_recent_max() -> usize {
    DEFAULT_RECENT_MAX
}

/// 設定変更で書き換えるメニューID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default = "default_custom_tools")]
    pub custom_tools: String,
    #[serde(default = "default_provided_tools")]
    pub provided_tools: String,
    #[serde(default = "default_doc_types")]
    pub doc_types: String,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            custom_tools: default_custom_tools(),
            provided_tools: default_provided_tools(),
            doc_types: default_doc_types(),
        }
    }
}

fn default_custom_tools() -> String {
    "tools.custom".to_string()
}

fn default_provided_tools() -> String {
    "tools.provided".to_string()
}

fn default_doc_types() -> String {
    "view.doc-types".to_string()
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub menu: MenuNode,
    #[serde(default)]
    pub layout: LayoutConfig,
    /// ノードID → アクセラレータ表記（メニュー定義より優先）
    #[serde(default)]
    pub keybindings: BTreeMap<String, String>,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub recent: RecentConfig,
    #[serde(default)]
    pub dynamic: DynamicConfig,
}

impl Config {
    /// メニューツリーだけを指定した設定（他は既定値）
    pub fn with_menu(menu: MenuNode) -> Self {
        Self {
            menu,
            layout: LayoutConfig::default(),
            keybindings: BTreeMap::new(),
            history: HistoryConfig::default(),
            recent: RecentConfig::default(),
            dynamic: DynamicConfig::default(),
        }
    }

    /// 組み込みの既定設定
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_CONFIG)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// 既定の設定ファイルの場所（`<config_dir>/scribe/config.json`）
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("scribe").join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// 既定の場所に設定があれば読み込み、なければ組み込み設定を使う
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load(&path),
            _ => Self::builtin(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.menu.validate().map_err(|err| ConfigError::InvalidValue {
            key: "menu".to_string(),
            value: err.to_string(),
        })?;

        if self.history.limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.limit".to_string(),
                value: "0".to_string(),
            });
        }

        for (key, id) in [
            ("recent.sub_root", &self.recent.sub_root),
            ("dynamic.custom_tools", &self.dynamic.custom_tools),
            ("dynamic.provided_tools", &self.dynamic.provided_tools),
            ("dynamic.doc_types", &self.dynamic.doc_types),
        ] {
            match self.menu.find(id) {
                Some(node) if node.kind.is_container() => {}
                Some(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: id.clone(),
                    })
                }
                None => log::warn!("{} refers to missing menu {}", key, id),
            }
        }
        Ok(())
    }

    /// 設定のキーバインドを変更通知の形にする
    pub fn keybinding_change(&self) -> KeybindingChange {
        KeybindingChange {
            affected: self.keybindings.keys().cloned().collect(),
            accelerators: self
                .keybindings
                .iter()
                .map(|(id, accelerator)| (id.clone(), accelerator.clone()))
                .collect(),
        }
    }
}
