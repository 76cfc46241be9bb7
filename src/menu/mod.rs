//! メニューモジュール
//!
//! メニューツリーの定義、設定変更通知、アクション表とメニューバーの解決

pub mod events;
pub mod node;
pub mod resolver;

// 公開API
pub use events::{
    ConfigChangeEvent, ConfigChangeListener, ConfigNotifier, DocTypeSpec, KeybindingChange,
    ListenerId, ToolSpec,
};
pub use node::{MenuNode, NodeKind, TargetKind, SEPARATOR_ID};
pub use resolver::{BuildReport, MenuResolver, PopupKind};
