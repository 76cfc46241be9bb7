//! UIモジュール
//!
//! UIスレッドへのタスク配送と、メニューバー等の描画用モデル

pub mod dispatch;
pub mod widgets;

// 公開API
pub use dispatch::{DeferredQueue, DeferredTask, UiHandle, UiMailbox, UiTask};
pub use widgets::{
    MenuBar, MenuWidget, PopupMenu, SelectionGroup, ToolBar, WidgetId, WidgetIds, WidgetKind,
};
