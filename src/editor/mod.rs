//! エディタモジュール
//!
//! 編集履歴のまとめ込みとドキュメント管理

pub mod document;
pub mod history;

// 公開API
pub use document::{Document, DocumentId, DocumentSet};
pub use history::{AtomicEdit, CompoundEdit, EditCoalescer, HistoryStatus, DEFAULT_HISTORY_LIMIT};
