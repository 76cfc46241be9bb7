//! アクションシステム
//!
//! メニューツリーの各葉ノードに対応する実行可能なアクションを定義する。
//! アクションは `enabled` / `selected` / アクセラレータの可変状態を持ち、
//! 実際の処理は [`ActionHandler`] に委ねる。

pub mod builtin;
pub mod factory;
pub mod registry;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::editor::{DocumentSet, HistoryStatus};
use crate::error::{ActionError, Result};
use crate::input::Accelerator;
use crate::menu::{MenuNode, NodeKind};

pub use factory::{ActionFactories, CustomFactory};
pub use registry::ActionRegistry;

/// 共有されるアクション
pub type SharedAction = Rc<Action>;

/// 履歴状態から有効/無効を決める更新関数
pub type HistoryUpdate = fn(&HistoryStatus) -> bool;

/// アクション実行の結果
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// 実行が成功したか
    pub success: bool,
    /// 結果メッセージ
    pub message: Option<String>,
    /// 画面更新が必要か
    pub needs_refresh: bool,
}

impl CommandResult {
    /// 成功結果を作成
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
            needs_refresh: true,
        }
    }

    /// メッセージ付き成功結果を作成
    pub fn success_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            needs_refresh: true,
        }
    }

    /// 画面更新なしの成功結果を作成
    pub fn success_no_refresh() -> Self {
        Self {
            success: true,
            message: None,
            needs_refresh: false,
        }
    }

    /// エラー結果を作成
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            needs_refresh: false,
        }
    }
}

/// アクションから外部（コンソール、ファイル処理など）への依頼
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    /// ツールの実行
    RunTool {
        tool_id: String,
        command: String,
        provided: bool,
    },
    /// 最近使ったファイルを開く
    OpenRecent(PathBuf),
    /// 最近使ったファイル一覧の消去
    ClearRecentFiles,
    /// 汎用アクションの通知（UI側が処理する）
    Dispatch { id: String, target: Option<String> },
}

/// アクション実行時に渡される文脈
pub struct ActionContext<'a> {
    pub documents: &'a mut DocumentSet,
    pub requests: &'a mut Vec<ActionRequest>,
}

impl<'a> ActionContext<'a> {
    pub fn new(documents: &'a mut DocumentSet, requests: &'a mut Vec<ActionRequest>) -> Self {
        Self {
            documents,
            requests,
        }
    }

    pub fn request(&mut self, request: ActionRequest) {
        self.requests.push(request);
    }
}

/// アクションの処理本体
pub trait ActionHandler {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult>;

    /// ノード種別に対応できるか
    fn supports(&self, kind: NodeKind) -> bool {
        let _ = kind;
        true
    }
}

/// 実行可能なアクション
pub struct Action {
    id: String,
    label: String,
    kind: NodeKind,
    target: Option<String>,
    group: Option<String>,
    enabled: Cell<bool>,
    selected: Cell<bool>,
    accelerator: Cell<Option<Accelerator>>,
    history_update: Option<HistoryUpdate>,
    handler: RefCell<Box<dyn ActionHandler>>,
}

impl Action {
    /// ノードからアクションを作成する
    ///
    /// ノードのアクセラレータ表記が不正な場合は割り当てなしとする。
    pub fn from_node(node: &MenuNode, handler: Box<dyn ActionHandler>) -> Self {
        let accelerator = node.accelerator.as_deref().and_then(|text| {
            Accelerator::parse(text)
                .map_err(|err| log::warn!("invalid accelerator {:?} on {}: {}", text, node.id, err))
                .ok()
        });

        Self {
            id: node.id.clone(),
            label: node.label().to_string(),
            kind: node.kind,
            target: node.target.clone(),
            group: None,
            enabled: Cell::new(true),
            selected: Cell::new(false),
            accelerator: Cell::new(accelerator),
            history_update: None,
            handler: RefCell::new(handler),
        }
    }

    /// 排他グループのキーを設定
    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group;
        self
    }

    /// 履歴状態に追従する更新関数を設定
    pub fn with_history_update(mut self, update: HistoryUpdate) -> Self {
        self.history_update = Some(update);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    pub fn set_selected(&self, selected: bool) {
        self.selected.set(selected);
    }

    pub fn accelerator(&self) -> Option<Accelerator> {
        self.accelerator.get()
    }

    pub fn set_accelerator(&self, accelerator: Option<Accelerator>) {
        self.accelerator.set(accelerator);
    }

    /// 履歴状態の変化を反映する（更新関数がなければ何もしない）
    pub fn update_from_history(&self, status: &HistoryStatus) {
        if let Some(update) = self.history_update {
            self.enabled.set(update(status));
        }
    }

    /// アクションを実行する
    ///
    /// 無効化されている場合は失敗結果を返す。チェックボックスは実行のたびに
    /// 選択状態を反転する。
    pub fn perform(&self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        if !self.is_enabled() {
            return Ok(CommandResult::error(format!("{} is disabled", self.id)));
        }

        let mut handler = self
            .handler
            .try_borrow_mut()
            .map_err(|_| ActionError::Busy {
                id: self.id.clone(),
            })?;

        if self.kind == NodeKind::CheckBox {
            self.selected.set(!self.selected.get());
        }

        handler.perform(ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.enabled.get())
            .field("selected", &self.selected.get())
            .field("accelerator", &self.accelerator.get())
            .finish()
    }
}
