//! 設定変更通知
//!
//! ツール一覧、キーバインド、ドキュメント種別の変更を購読者へ配信する。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::menu::{MenuNode, NodeKind, TargetKind};

/// 外部ツールの定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// メニューノードID
    pub id: String,
    pub name: String,
    /// 実行コマンド
    pub command: String,
    #[serde(default)]
    pub accelerator: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl ToolSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            command: command.into(),
            accelerator: None,
            icon: None,
        }
    }

    pub fn with_accelerator(mut self, accelerator: impl Into<String>) -> Self {
        self.accelerator = Some(accelerator.into());
        self
    }

    /// ツールノードに変換する
    pub fn to_node(&self, kind: NodeKind) -> MenuNode {
        let mut node = MenuNode::new(self.id.clone(), kind)
            .with_name(self.name.clone())
            .with_target(TargetKind::Default, self.command.clone());
        node.accelerator = self.accelerator.clone();
        node.icon = self.icon.clone();
        node
    }
}

/// ドキュメント種別の定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocTypeSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl DocTypeSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extensions: Vec::new(),
        }
    }

    /// 排他選択のラジオ項目に変換する
    pub fn to_node(&self, group: &str) -> MenuNode {
        MenuNode::new(self.id.clone(), NodeKind::Radio)
            .with_name(self.name.clone())
            .with_target(TargetKind::Default, self.id.clone())
            .with_group(group)
    }
}

/// キーバインド変更の内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeybindingChange {
    /// 影響を受けるノードID（通知順）
    pub affected: Vec<String>,
    /// ノードID → 新しいアクセラレータ表記（欠落または空文字は割り当て解除）
    pub accelerators: HashMap<String, String>,
}

impl KeybindingChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, id: impl Into<String>, accelerator: impl Into<String>) -> Self {
        let id = id.into();
        self.accelerators.insert(id.clone(), accelerator.into());
        self.affected.push(id);
        self
    }

    pub fn unbind(mut self, id: impl Into<String>) -> Self {
        self.affected.push(id.into());
        self
    }
}

/// 設定変更イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    CustomToolChanged { tools: Vec<ToolSpec> },
    ProvidedToolChanged { tools: Vec<ToolSpec> },
    KeybindingChanged(KeybindingChange),
    DocTypeChanged {
        doc_types: Vec<DocTypeSpec>,
        /// 選択状態にする種別
        active: Option<String>,
    },
}

impl ConfigChangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigChangeEvent::CustomToolChanged { .. } => "custom-tool",
            ConfigChangeEvent::ProvidedToolChanged { .. } => "provided-tool",
            ConfigChangeEvent::KeybindingChanged(_) => "keybinding",
            ConfigChangeEvent::DocTypeChanged { .. } => "doc-type",
        }
    }
}

/// 設定変更リスナー
pub trait ConfigChangeListener {
    fn custom_tool_changed(&mut self, tools: &[ToolSpec]) {
        let _ = tools;
    }

    fn provided_tool_changed(&mut self, tools: &[ToolSpec]) {
        let _ = tools;
    }

    fn keybinding_changed(&mut self, change: &KeybindingChange) {
        let _ = change;
    }

    fn doc_type_changed(&mut self, doc_types: &[DocTypeSpec], active: Option<&str>) {
        let _ = (doc_types, active);
    }

    /// イベント種別ごとのメソッドへ振り分ける
    fn on_config_change(&mut self, event: &ConfigChangeEvent) {
        match event {
            ConfigChangeEvent::CustomToolChanged { tools } => self.custom_tool_changed(tools),
            ConfigChangeEvent::ProvidedToolChanged { tools } => self.provided_tool_changed(tools),
            ConfigChangeEvent::KeybindingChanged(change) => self.keybinding_changed(change),
            ConfigChangeEvent::DocTypeChanged { doc_types, active } => {
                self.doc_type_changed(doc_types, active.as_deref())
            }
        }
    }
}

/// リスナーID
pub type ListenerId = usize;

/// 設定変更の配信
#[derive(Default)]
pub struct ConfigNotifier {
    listeners: Vec<(ListenerId, Box<dyn ConfigChangeListener>)>,
    next_listener_id: ListenerId,
    dispatched: usize,
}

impl ConfigNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// リスナーを追加（登録順に通知される）
    pub fn add_listener(&mut self, listener: Box<dyn ConfigChangeListener>) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// 配信済みイベント数
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn notify(&mut self, event: &ConfigChangeEvent) {
        log::debug!(
            "config change {} -> {} listener(s)",
            event.name(),
            self.listeners.len()
        );
        for (_, listener) in &mut self.listeners {
            listener.on_config_change(event);
        }
        self.dispatched += 1;
    }
}

impl std::fmt::Debug for ConfigNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigNotifier")
            .field("listeners", &self.listeners.len())
            .field("dispatched", &self.dispatched)
            .finish()
    }
}
