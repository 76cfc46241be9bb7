//! 描画用メニューモデル
//!
//! メニューツリーから組み立てられる具体的なウィジェット階層。
//! ウィジェットは構築のたびに新しい [`WidgetId`] を受け取るので、
//! 再構築の有無は ID の比較で判別できる。

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::action::SharedAction;
use crate::input::Accelerator;

/// ウィジェットID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub usize);

/// ウィジェットID の払い出し
#[derive(Debug, Default)]
pub struct WidgetIds {
    next_id: usize,
}

impl WidgetIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> WidgetId {
        let id = WidgetId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// ウィジェット種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Menu,
    Item,
    CheckBox,
    Radio,
    Separator,
}

/// ラジオ項目の排他選択グループ
///
/// メニューバーとポップアップの同じ項目は同じグループを共有する。
#[derive(Debug)]
pub struct SelectionGroup {
    key: String,
    members: RefCell<Vec<SharedAction>>,
}

impl SelectionGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            members: RefCell::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// メンバーに加える（同じ ID は新しいアクションで置き換える）
    pub fn join(&self, action: SharedAction) {
        let mut members = self.members.borrow_mut();
        match members.iter_mut().find(|member| member.id() == action.id()) {
            Some(slot) => *slot = action,
            None => members.push(action),
        }
    }

    pub fn clear(&self) {
        self.members.borrow_mut().clear();
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members
            .borrow()
            .iter()
            .map(|member| member.id().to_string())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.borrow().iter().any(|member| member.id() == id)
    }

    /// 選択中のメンバー
    pub fn selected(&self) -> Option<String> {
        self.members
            .borrow()
            .iter()
            .find(|member| member.is_selected())
            .map(|member| member.id().to_string())
    }

    /// 指定メンバーを選択し、他の選択を外す
    pub fn select(&self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        for member in self.members.borrow().iter() {
            member.set_selected(member.id() == id);
        }
        true
    }
}

/// メニューウィジェット
#[derive(Debug)]
pub struct MenuWidget {
    id: WidgetId,
    kind: WidgetKind,
    node_id: String,
    label: String,
    mnemonic: Option<char>,
    icon: Option<String>,
    action: Option<SharedAction>,
    group: Option<Rc<SelectionGroup>>,
    children: Vec<MenuWidget>,
}

impl MenuWidget {
    pub fn menu(
        id: WidgetId,
        node_id: impl Into<String>,
        label: impl Into<String>,
        children: Vec<MenuWidget>,
    ) -> Self {
        Self {
            id,
            kind: WidgetKind::Menu,
            node_id: node_id.into(),
            label: label.into(),
            mnemonic: None,
            icon: None,
            action: None,
            group: None,
            children,
        }
    }

    pub fn separator(id: WidgetId, node_id: impl Into<String>) -> Self {
        Self {
            id,
            kind: WidgetKind::Separator,
            node_id: node_id.into(),
            label: String::new(),
            mnemonic: None,
            icon: None,
            action: None,
            group: None,
            children: Vec::new(),
        }
    }

    /// アクションに結び付いた項目
    pub fn action_item(id: WidgetId, kind: WidgetKind, action: SharedAction) -> Self {
        Self {
            id,
            kind,
            node_id: action.id().to_string(),
            label: action.label().to_string(),
            mnemonic: None,
            icon: None,
            action: Some(action),
            group: None,
            children: Vec::new(),
        }
    }

    pub fn with_mnemonic(mut self, mnemonic: Option<char>) -> Self {
        self.mnemonic = mnemonic;
        self
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_group(mut self, group: Rc<SelectionGroup>) -> Self {
        self.group = Some(group);
        self
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn mnemonic(&self) -> Option<char> {
        self.mnemonic
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn action(&self) -> Option<&SharedAction> {
        self.action.as_ref()
    }

    pub fn group(&self) -> Option<&Rc<SelectionGroup>> {
        self.group.as_ref()
    }

    pub fn children(&self) -> &[MenuWidget] {
        &self.children
    }

    /// 表示するアクセラレータ（アクションの現在値を読む）
    pub fn accelerator(&self) -> Option<Accelerator> {
        self.action.as_ref().and_then(|action| action.accelerator())
    }

    pub fn is_enabled(&self) -> bool {
        self.action.as_ref().map_or(true, |action| action.is_enabled())
    }

    pub fn is_selected(&self) -> bool {
        self.action.as_ref().map_or(false, |action| action.is_selected())
    }

    pub fn find(&self, node_id: &str) -> Option<&MenuWidget> {
        if self.node_id == node_id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(node_id))
    }

    fn collect_ids(&self, ids: &mut Vec<WidgetId>) {
        ids.push(self.id);
        for child in &self.children {
            child.collect_ids(ids);
        }
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.kind {
            WidgetKind::Separator => {
                let _ = writeln!(out, "{}----", indent);
            }
            _ => {
                let marker = match self.kind {
                    WidgetKind::CheckBox | WidgetKind::Radio if self.is_selected() => "[x] ",
                    WidgetKind::CheckBox | WidgetKind::Radio => "[ ] ",
                    _ => "",
                };
                let _ = write!(out, "{}{}{}", indent, marker, self.label);
                if let Some(accelerator) = self.accelerator() {
                    let _ = write!(out, "  {}", accelerator);
                }
                if !self.is_enabled() {
                    out.push_str("  (disabled)");
                }
                out.push('\n');
            }
        }
        for child in &self.children {
            child.write_outline(out, depth + 1);
        }
    }
}

fn find_in<'a>(widgets: &'a [MenuWidget], node_id: &str) -> Option<&'a MenuWidget> {
    widgets.iter().find_map(|widget| widget.find(node_id))
}

fn ids_of(widgets: &[MenuWidget]) -> Vec<WidgetId> {
    let mut ids = Vec::new();
    for widget in widgets {
        widget.collect_ids(&mut ids);
    }
    ids
}

fn outline_of(widgets: &[MenuWidget]) -> String {
    let mut out = String::new();
    for widget in widgets {
        widget.write_outline(&mut out, 0);
    }
    out
}

/// メニューバー
#[derive(Debug, Default)]
pub struct MenuBar {
    menus: Vec<MenuWidget>,
}

impl MenuBar {
    pub fn new(menus: Vec<MenuWidget>) -> Self {
        Self { menus }
    }

    pub fn menus(&self) -> &[MenuWidget] {
        &self.menus
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// 子ウィジェットをすべて取り除く
    pub fn clear(&mut self) {
        self.menus.clear();
    }

    pub fn find(&self, node_id: &str) -> Option<&MenuWidget> {
        find_in(&self.menus, node_id)
    }

    /// 全ウィジェットの ID（前順）
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        ids_of(&self.menus)
    }

    pub fn outline(&self) -> String {
        outline_of(&self.menus)
    }
}

/// ツールバー
#[derive(Debug, Default)]
pub struct ToolBar {
    buttons: Vec<MenuWidget>,
}

impl ToolBar {
    pub fn new(buttons: Vec<MenuWidget>) -> Self {
        Self { buttons }
    }

    pub fn buttons(&self) -> &[MenuWidget] {
        &self.buttons
    }

    pub fn find(&self, node_id: &str) -> Option<&MenuWidget> {
        find_in(&self.buttons, node_id)
    }

    pub fn widget_ids(&self) -> Vec<WidgetId> {
        ids_of(&self.buttons)
    }
}

/// ポップアップメニュー
#[derive(Debug)]
pub struct PopupMenu {
    name: String,
    items: Vec<MenuWidget>,
}

impl PopupMenu {
    pub fn new(name: impl Into<String>, items: Vec<MenuWidget>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[MenuWidget] {
        &self.items
    }

    pub fn find(&self, node_id: &str) -> Option<&MenuWidget> {
        find_in(&self.items, node_id)
    }

    pub fn outline(&self) -> String {
        outline_of(&self.items)
    }
}
