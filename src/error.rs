//! エラーハンドリングシステム
//!
//! scribe 全体で使用される統一されたエラー型を定義
//! 致命的でない失敗（アクション生成失敗など）は呼び出し側で吸収しログに残す

use thiserror::Error;

/// ライブラリ全体のエラー型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScribeError {
    /// メニューツリー操作エラー
    #[error("Menu operation failed: {0}")]
    Menu(#[from] MenuError),

    /// アクション生成・実行エラー
    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    /// 編集履歴エラー
    #[error("History operation failed: {0}")]
    History(#[from] HistoryError),

    /// バッファ操作エラー
    #[error("Buffer operation failed: {0}")]
    Buffer(#[from] BufferError),

    /// 設定エラー
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// キー表記エラー
    #[error("Key parse error: {0}")]
    Key(#[from] KeyParseError),

    /// ファイル読み込みエラー
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// UIスレッドとの連携エラー
    #[error("UI dispatch error: {0}")]
    Ui(String),
}

/// メニューツリー固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MenuError {
    #[error("Duplicate menu id: {id}")]
    DuplicateId { id: String },

    #[error("Menu tree root must be of kind root, found {kind}")]
    MissingRoot { kind: String },

    #[error("Unknown menu node: {id}")]
    UnknownNode { id: String },

    #[error("Node {id} cannot hold children")]
    NotAContainer { id: String },
}

/// アクション固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("No action factory registered for target {target}")]
    UnknownTarget { target: String },

    #[error("Node {id} has no target")]
    MissingTarget { id: String },

    #[error("Construction of {target} failed: {message}")]
    Construction { target: String, message: String },

    #[error("Action {id} does not provide the expected capability")]
    CapabilityMismatch { id: String },

    #[error("Action {id} is already running")]
    Busy { id: String },

    #[error("Unknown action: {id}")]
    NotRegistered { id: String },
}

/// 編集履歴固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("Edit at {offset} could not be reverted")]
    CannotUndo { offset: usize },

    #[error("Edit at {offset} could not be re-applied")]
    CannotRedo { offset: usize },
}

/// バッファ操作固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    #[error("Offset {offset} out of range (len {len})")]
    OutOfRange { offset: usize, len: usize },

    #[error("Range {offset}+{length} out of range (len {len})")]
    RangeOutOfBounds {
        offset: usize,
        length: usize,
        len: usize,
    },
}

/// 設定固有のエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read configuration {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid configuration: {message}")]
    Parse { message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("No configuration directory available")]
    NoConfigDir,
}

/// キー表記のパースエラー
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyParseError {
    #[error("Empty key specification")]
    Empty,

    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("Unknown key: {0}")]
    UnknownKey(String),
}

/// プロジェクト標準のResult型
pub type Result<T> = std::result::Result<T, ScribeError>;

/// 各モジュール固有のResult型
pub mod menu {
    pub type Result<T> = std::result::Result<T, super::MenuError>;
}

pub mod buffer {
    pub type Result<T> = std::result::Result<T, super::BufferError>;
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io {
            path: String::new(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse {
            message: format!("{} (line {}, column {})", error, error.line(), error.column()),
        }
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(error: serde_json::Error) -> Self {
        ScribeError::Config(error.into())
    }
}
