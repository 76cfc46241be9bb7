//! 入力処理モジュール
//!
//! アクセラレータ表記の解析とキーイベントの照合

pub mod accelerator;

// 公開API
pub use accelerator::{Accelerator, KeyCode, KeyModifiers};
