//! scribe - エディタコア
//!
//! 編集履歴のまとめ込み（複合 undo）と、メニューツリーからのアクション解決

// コアモジュール
pub mod config;
pub mod error;
pub mod logging;

// データ層
pub mod buffer;

// 編集層
pub mod editor;

// ロジック層
pub mod action;
pub mod input;
pub mod menu;

// 表示層
pub mod ui;

// セッション
pub mod app;

// 公開API
pub use app::Session;
pub use config::Config;
pub use editor::{Document, DocumentSet, EditCoalescer, HistoryStatus};
pub use error::{Result, ScribeError};
pub use menu::{ConfigChangeEvent, MenuNode, MenuResolver};
