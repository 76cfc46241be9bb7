//! メニュー/アクションツリーの解決
//!
//! メニューツリーを走査してアクション表を作り、メニューバー、ツールバー、
//! ポップアップを組み立てる。設定変更の種類によって更新方法を使い分ける。
//! * キーバインド: 登録済みアクションのアクセラレータだけを書き換える
//! * ツール、ドキュメント種別: ツリーを書き換えてメニューバーを作り直す

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::action::{builtin, ActionFactories, ActionRegistry, SharedAction};
use crate::config::{DynamicConfig, LayoutConfig, RecentConfig};
use crate::error::menu::Result;
use crate::error::ActionError;
use crate::input::Accelerator;
use crate::menu::{
    ConfigChangeListener, DocTypeSpec, KeybindingChange, MenuNode, NodeKind, TargetKind,
    ToolSpec, SEPARATOR_ID,
};
use crate::ui::{MenuBar, MenuWidget, PopupMenu, SelectionGroup, ToolBar, WidgetIds, WidgetKind};

/// アクション構築の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// 新たに登録したノードID
    pub registered: Vec<String>,
    /// 既に登録済みだったノードID
    pub already_present: Vec<String>,
    /// アクションを作れなかったノードID と原因
    pub omitted: Vec<(String, ActionError)>,
}

impl BuildReport {
    /// アクションが必要なノードの総数
    pub fn visited(&self) -> usize {
        self.registered.len() + self.already_present.len() + self.omitted.len()
    }

    pub fn is_omitted(&self, id: &str) -> bool {
        self.omitted.iter().any(|(omitted, _)| omitted == id)
    }
}

/// ポップアップの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    /// 編集領域
    Edit,
    /// ドキュメントタブ
    Tab,
}

impl PopupKind {
    pub fn root_id(self) -> &'static str {
        match self {
            PopupKind::Edit => "popup.edit",
            PopupKind::Tab => "popup.tab",
        }
    }
}

/// メニュー/アクションツリーの解決器
#[derive(Debug)]
pub struct MenuResolver {
    tree: MenuNode,
    layout: LayoutConfig,
    dynamic: DynamicConfig,
    recent: RecentConfig,
    registry: ActionRegistry,
    factories: ActionFactories,
    /// ノードID → 設定されたアクセラレータ（None は割り当て解除）
    ///
    /// 動的サブルートの再構築で作り直されたアクションにも適用する。
    keybindings: HashMap<String, Option<Accelerator>>,
    /// 排他グループキー → 選択グループ（再構築をまたいで共有）
    groups: HashMap<String, Rc<SelectionGroup>>,
    widget_ids: WidgetIds,
    menu_bar: MenuBar,
    tool_bar: ToolBar,
    rebuilds: usize,
}

impl MenuResolver {
    pub fn new(tree: MenuNode) -> Result<Self> {
        tree.validate()?;
        Ok(Self {
            tree,
            layout: LayoutConfig::default(),
            dynamic: DynamicConfig::default(),
            recent: RecentConfig::default(),
            registry: ActionRegistry::new(),
            factories: ActionFactories::new(),
            keybindings: HashMap::new(),
            groups: HashMap::new(),
            widget_ids: WidgetIds::new(),
            menu_bar: MenuBar::default(),
            tool_bar: ToolBar::default(),
            rebuilds: 0,
        })
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_dynamic(mut self, dynamic: DynamicConfig) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn with_recent(mut self, recent: RecentConfig) -> Self {
        self.recent = recent;
        self
    }

    pub fn with_factories(mut self, factories: ActionFactories) -> Self {
        self.factories = factories;
        self
    }

    pub fn tree(&self) -> &MenuNode {
        &self.tree
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn lookup(&self, id: &str) -> Option<SharedAction> {
        self.registry.lookup(id)
    }

    pub fn find_by_accelerator(&self, accelerator: &Accelerator) -> Option<SharedAction> {
        self.registry.find_by_accelerator(accelerator)
    }

    pub fn menu_bar(&self) -> &MenuBar {
        &self.menu_bar
    }

    pub fn tool_bar(&self) -> &ToolBar {
        &self.tool_bar
    }

    pub fn selection_group(&self, key: &str) -> Option<Rc<SelectionGroup>> {
        self.groups.get(key).cloned()
    }

    /// メニューバーを作り直した回数
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// 指定ツリーの全ノードを訪れてアクションを登録する
    ///
    /// 既に登録済みの ID は置き換えない。生成に失敗したノードは記録して
    /// 読み飛ばす。
    pub fn build_actions(&mut self, root: &MenuNode) -> BuildReport {
        build_into(&mut self.registry, &self.factories, &self.keybindings, root)
    }

    /// 保持しているツリー全体のアクションを登録する
    pub fn build_all(&mut self) -> BuildReport {
        build_into(&mut self.registry, &self.factories, &self.keybindings, &self.tree)
    }

    /// メニューバーとツールバーを現在のツリーから組み立てる
    pub fn load_menu_bar(&mut self) {
        let mut renderer = Renderer {
            registry: &self.registry,
            widget_ids: &mut self.widget_ids,
            groups: &mut self.groups,
        };

        let menus = renderer.render_all(&self.tree.children);

        let mut buttons = Vec::new();
        for (index, id) in self.layout.toolbar.iter().enumerate() {
            if id == SEPARATOR_ID {
                let widget_id = renderer.widget_ids.next();
                buttons.push(MenuWidget::separator(
                    widget_id,
                    format!("toolbar.separator.{}", index),
                ));
                continue;
            }
            match self.tree.find(id) {
                Some(node) => buttons.extend(renderer.render(node)),
                None => log::debug!("toolbar entry {} not in menu tree", id),
            }
        }

        self.menu_bar = MenuBar::new(menus);
        self.tool_bar = ToolBar::new(buttons);
    }

    /// メニューバーを空にしてから組み立て直す
    pub fn rebuild(&mut self) {
        self.menu_bar.clear();
        self.load_menu_bar();
        self.rebuilds += 1;
        log::debug!(
            "menu bar rebuilt ({} widgets, rebuild #{})",
            self.menu_bar.widget_ids().len(),
            self.rebuilds
        );
    }

    /// ポップアップ用の作業ツリー（深いコピー）
    pub fn popup_tree(&self, kind: PopupKind) -> MenuNode {
        let ids = match kind {
            PopupKind::Edit => &self.layout.edit_popup,
            PopupKind::Tab => &self.layout.tab_popup,
        };
        self.tree.subset(kind.root_id(), ids)
    }

    /// ポップアップを組み立てる
    ///
    /// 項目はメニューバーと同じアクションと選択グループを使う。
    pub fn popup(&mut self, kind: PopupKind) -> PopupMenu {
        let working = self.popup_tree(kind);
        let report = self.build_actions(&working);
        if !report.registered.is_empty() {
            log::debug!("popup {} registered {:?}", kind.root_id(), report.registered);
        }

        let mut renderer = Renderer {
            registry: &self.registry,
            widget_ids: &mut self.widget_ids,
            groups: &mut self.groups,
        };
        let items = renderer.render_all(&working.children);
        PopupMenu::new(kind.root_id(), items)
    }

    /// 登録済みアクションのアクセラレータを書き換える
    ///
    /// ツリーの走査やメニューバーの再構築は行わない。不正な表記は読み飛ばす。
    /// 未登録の ID は割り当てだけを覚えておき、後で登録されたときに適用する。
    /// 書き換えた件数を返す。
    pub fn patch_keybindings(&mut self, change: &KeybindingChange) -> usize {
        let mut patched = 0;
        for id in &change.affected {
            let accelerator = match change.accelerators.get(id).map(|text| text.trim()) {
                None | Some("") => None,
                Some(text) => match Accelerator::parse(text) {
                    Ok(accelerator) => Some(accelerator),
                    Err(err) => {
                        log::warn!("invalid accelerator {:?} for {}: {}", text, id, err);
                        continue;
                    }
                },
            };
            self.keybindings.insert(id.clone(), accelerator);

            let Some(action) = self.registry.lookup(id) else {
                log::debug!("keybinding for unregistered action {} kept for later", id);
                continue;
            };
            action.set_accelerator(accelerator);
            patched += 1;
        }
        log::debug!("patched {} accelerator(s)", patched);
        patched
    }

    /// ツール一覧を差し替えて再構築する
    pub fn replace_tools(&mut self, kind: NodeKind, tools: &[ToolSpec]) -> Result<()> {
        let sub_root = match kind {
            NodeKind::ProvidedTool => self.dynamic.provided_tools.clone(),
            _ => self.dynamic.custom_tools.clone(),
        };
        let nodes = tools.iter().map(|tool| tool.to_node(kind)).collect();
        let result = self.replace_dynamic(&sub_root, nodes);
        self.rebuild();
        result
    }

    /// ドキュメント種別を差し替えて再構築する
    pub fn replace_doc_types(&mut self, doc_types: &[DocTypeSpec], active: Option<&str>) -> Result<()> {
        let sub_root = self.dynamic.doc_types.clone();
        let nodes = doc_types
            .iter()
            .map(|doc_type| doc_type.to_node(&sub_root))
            .collect();
        if let Some(group) = self.groups.get(&sub_root) {
            group.clear();
        }

        let result = self.replace_dynamic(&sub_root, nodes);
        self.rebuild();
        if let Some(active) = active {
            if !self.select(active) {
                log::debug!("active doc type {} not found", active);
            }
        }
        result
    }

    /// 最近使ったファイルの項目を差し替えて再構築する
    pub fn update_recent_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        let sub_root = self.recent.sub_root.clone();
        let nodes = paths
            .iter()
            .take(self.recent.max)
            .enumerate()
            .map(|(index, path)| recent_node(&sub_root, index, path))
            .collect();
        self.replace_dynamic(&sub_root, nodes)?;
        self.rebuild();
        Ok(())
    }

    /// チェックボックスの反転、またはラジオ項目の排他選択
    pub fn select(&self, id: &str) -> bool {
        let Some(action) = self.registry.lookup(id) else {
            return false;
        };
        match action.kind() {
            NodeKind::CheckBox => {
                action.set_selected(!action.is_selected());
                true
            }
            NodeKind::Radio => match action.group().and_then(|key| self.groups.get(key)) {
                Some(group) if group.contains(id) => group.select(id),
                _ => {
                    action.set_selected(true);
                    true
                }
            },
            _ => false,
        }
    }

    /// 登録とウィジェットをすべて破棄する
    pub fn clear(&mut self) {
        self.registry.clear();
        self.groups.clear();
        self.menu_bar.clear();
        self.tool_bar = ToolBar::default();
    }

    /// サブルートの子を置き換え、古い子のアクション登録を外して新しい子を登録する
    fn replace_dynamic(&mut self, sub_root: &str, nodes: Vec<MenuNode>) -> Result<()> {
        let old = self.tree.replace_children(sub_root, nodes)?;
        if let Err(err) = self.tree.validate() {
            // ID 衝突などで不正になった場合は元に戻す
            if let Err(restore) = self.tree.replace_children(sub_root, old) {
                log::warn!("could not restore {}: {}", sub_root, restore);
            }
            return Err(err);
        }

        for node in &old {
            node.walk(&mut |removed, _| {
                self.registry.remove(&removed.id);
            });
        }

        let report = self.build_all();
        log::debug!(
            "{} updated: {} registered, {} omitted",
            sub_root,
            report.registered.len(),
            report.omitted.len()
        );
        Ok(())
    }
}

impl ConfigChangeListener for MenuResolver {
    fn custom_tool_changed(&mut self, tools: &[ToolSpec]) {
        if let Err(err) = self.replace_tools(NodeKind::CustomTool, tools) {
            log::warn!("custom tools not applied: {}", err);
        }
    }

    fn provided_tool_changed(&mut self, tools: &[ToolSpec]) {
        if let Err(err) = self.replace_tools(NodeKind::ProvidedTool, tools) {
            log::warn!("provided tools not applied: {}", err);
        }
    }

    fn keybinding_changed(&mut self, change: &KeybindingChange) {
        self.patch_keybindings(change);
    }

    fn doc_type_changed(&mut self, doc_types: &[DocTypeSpec], active: Option<&str>) {
        if let Err(err) = self.replace_doc_types(doc_types, active) {
            log::warn!("doc types not applied: {}", err);
        }
    }
}

fn build_into(
    registry: &mut ActionRegistry,
    factories: &ActionFactories,
    keybindings: &HashMap<String, Option<Accelerator>>,
    root: &MenuNode,
) -> BuildReport {
    let mut report = BuildReport::default();
    root.walk(&mut |node, parent| {
        if !node.kind.requires_action() {
            return;
        }
        if registry.contains(&node.id) {
            report.already_present.push(node.id.clone());
            return;
        }
        match factories.create(node, node.group_key(parent)) {
            Ok(Some(action)) => {
                if let Some(accelerator) = keybindings.get(&node.id) {
                    action.set_accelerator(*accelerator);
                }
                registry.register(Rc::new(action));
                report.registered.push(node.id.clone());
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("no action for {}: {}", node.id, err);
                report.omitted.push((node.id.clone(), err));
            }
        }
    });
    report
}

fn recent_node(sub_root: &str, index: usize, path: &Path) -> MenuNode {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut node = MenuNode::new(format!("{}.{}", sub_root, index), NodeKind::Item)
        .with_name(format!("{} {}", index + 1, name))
        .with_target(
            TargetKind::Builtin,
            format!("{}:{}", builtin::OPEN_RECENT, path.display()),
        );
    node.mnemonic = char::from_digit(index as u32 + 1, 10);
    node
}

/// ツリーからウィジェットを組み立てる
struct Renderer<'a> {
    registry: &'a ActionRegistry,
    widget_ids: &'a mut WidgetIds,
    groups: &'a mut HashMap<String, Rc<SelectionGroup>>,
}

impl Renderer<'_> {
    fn render_all(&mut self, nodes: &[MenuNode]) -> Vec<MenuWidget> {
        nodes.iter().filter_map(|node| self.render(node)).collect()
    }

    fn render(&mut self, node: &MenuNode) -> Option<MenuWidget> {
        match node.kind {
            NodeKind::Root => None,
            NodeKind::Menu => {
                let id = self.widget_ids.next();
                let children = self.render_all(&node.children);
                Some(
                    MenuWidget::menu(id, node.id.clone(), node.label(), children)
                        .with_mnemonic(node.mnemonic)
                        .with_icon(node.icon.clone()),
                )
            }
            NodeKind::Separator => Some(MenuWidget::separator(self.widget_ids.next(), node.id.clone())),
            kind => {
                // アクションのない項目は表示しない
                let Some(action) = self.registry.lookup(&node.id) else {
                    log::debug!("{} has no action, not rendered", node.id);
                    return None;
                };
                let widget_kind = match kind {
                    NodeKind::CheckBox => WidgetKind::CheckBox,
                    NodeKind::Radio => WidgetKind::Radio,
                    _ => WidgetKind::Item,
                };
                let widget = MenuWidget::action_item(self.widget_ids.next(), widget_kind, action.clone())
                    .with_mnemonic(node.mnemonic)
                    .with_icon(node.icon.clone());

                if kind != NodeKind::Radio {
                    return Some(widget);
                }
                let key = action
                    .group()
                    .map(str::to_string)
                    .unwrap_or_else(|| node.id.clone());
                let group = self
                    .groups
                    .entry(key.clone())
                    .or_insert_with(|| Rc::new(SelectionGroup::new(key)))
                    .clone();
                group.join(action);
                Some(widget.with_group(group))
            }
        }
    }
}
