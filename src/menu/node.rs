//! メニューツリー
//!
//! メニュー、ツールバー、ポップアップの宣言的な定義。親が子を値として所有し、
//! 複製は常に深いコピーになる（部分木を複数のツリーで共有しない）。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::menu::Result;
use crate::error::MenuError;

/// 区切り線を表すレイアウト上の予約ID
pub const SEPARATOR_ID: &str = "separator";

/// ノード種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Menu,
    Item,
    ProvidedTool,
    CustomTool,
    CheckBox,
    Radio,
    Separator,
}

impl NodeKind {
    /// アクションの割り当てが必要な種別か
    pub fn requires_action(self) -> bool {
        matches!(
            self,
            NodeKind::Item
                | NodeKind::ProvidedTool
                | NodeKind::CustomTool
                | NodeKind::CheckBox
                | NodeKind::Radio
        )
    }

    /// 子を持てる種別か
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Menu)
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Menu => "menu",
            NodeKind::Item => "item",
            NodeKind::ProvidedTool => "provided-tool",
            NodeKind::CustomTool => "custom-tool",
            NodeKind::CheckBox => "check-box",
            NodeKind::Radio => "radio",
            NodeKind::Separator => "separator",
        }
    }
}

/// アクション実装の選び方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// 組み込み実装
    Builtin,
    /// 名前で登録されたファクトリ
    Custom,
    /// 汎用ラッパー
    #[default]
    Default,
}

/// メニューツリーのノード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub target_kind: TargetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<char>,
    /// 排他選択グループ（未指定ならラジオ項目は親ノードでまとまる）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            target: None,
            target_kind: TargetKind::Default,
            accelerator: None,
            icon: None,
            large_icon: None,
            mnemonic: None,
            group: None,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new("root", NodeKind::Root)
    }

    pub fn separator(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Separator)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_target(mut self, kind: TargetKind, target: impl Into<String>) -> Self {
        self.target_kind = kind;
        self.target = Some(target.into());
        self
    }

    pub fn with_accelerator(mut self, accelerator: impl Into<String>) -> Self {
        self.accelerator = Some(accelerator.into());
        self
    }

    pub fn with_mnemonic(mut self, mnemonic: char) -> Self {
        self.mnemonic = Some(mnemonic);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_child(mut self, child: MenuNode) -> Self {
        self.children.push(child);
        self
    }

    /// 表示名（未設定なら ID）
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// ラジオ項目の排他グループキー
    pub fn group_key(&self, parent: Option<&MenuNode>) -> Option<String> {
        if self.kind != NodeKind::Radio {
            return None;
        }
        self.group
            .clone()
            .or_else(|| parent.map(|parent| parent.id.clone()))
    }

    /// 親→子の順（前順）ですべてのノードを訪れる
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a MenuNode, Option<&'a MenuNode>),
    {
        self.walk_inner(None, visit);
    }

    fn walk_inner<'a, F>(&'a self, parent: Option<&'a MenuNode>, visit: &mut F)
    where
        F: FnMut(&'a MenuNode, Option<&'a MenuNode>),
    {
        visit(self, parent);
        for child in &self.children {
            child.walk_inner(Some(self), visit);
        }
    }

    /// ノード数（自身を含む）
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuNode::count).sum::<usize>()
    }

    pub fn find(&self, id: &str) -> Option<&MenuNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut MenuNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// ノードとその親を探す
    pub fn find_with_parent(&self, id: &str) -> Option<(&MenuNode, Option<&MenuNode>)> {
        if self.id == id {
            return Some((self, None));
        }
        self.find_child_of(id)
    }

    fn find_child_of(&self, id: &str) -> Option<(&MenuNode, Option<&MenuNode>)> {
        for child in &self.children {
            if child.id == id {
                return Some((child, Some(self)));
            }
            if let Some(found) = child.find_child_of(id) {
                return Some(found);
            }
        }
        None
    }

    /// 子孫（自身を含む）の ID をすべて集める
    pub fn ids(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.count());
        self.walk(&mut |node, _| ids.push(node.id.clone()));
        ids
    }

    /// ツリーの整合性を検査する
    ///
    /// * 最上位はルート種別
    /// * ID がツリー全体で一意
    /// * 子を持つのはルートとメニューのみ
    pub fn validate(&self) -> Result<()> {
        if self.kind != NodeKind::Root {
            return Err(MenuError::MissingRoot {
                kind: self.kind.name().to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut failure = None;
        self.walk(&mut |node, _| {
            if failure.is_some() {
                return;
            }
            if !seen.insert(node.id.as_str()) {
                failure = Some(MenuError::DuplicateId {
                    id: node.id.clone(),
                });
            } else if !node.children.is_empty() && !node.kind.is_container() {
                failure = Some(MenuError::NotAContainer {
                    id: node.id.clone(),
                });
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 指定ノードの子を置き換え、以前の子を返す
    pub fn replace_children(&mut self, id: &str, children: Vec<MenuNode>) -> Result<Vec<MenuNode>> {
        let node = self.find_mut(id).ok_or_else(|| MenuError::UnknownNode { id: id.to_string() })?;
        if !node.kind.is_container() {
            return Err(MenuError::NotAContainer { id: id.to_string() });
        }
        Ok(std::mem::replace(&mut node.children, children))
    }

    /// ID 列からポップアップ用の作業ツリーを作る
    ///
    /// 見つからない ID は無視し、[`SEPARATOR_ID`] は区切り線になる。
    /// 返るツリーはすべて深いコピー。
    pub fn subset(&self, root_id: &str, ids: &[String]) -> MenuNode {
        let mut root = MenuNode::new(root_id, NodeKind::Root);
        for (index, id) in ids.iter().enumerate() {
            if id == SEPARATOR_ID {
                root.children
                    .push(MenuNode::separator(format!("{}.separator.{}", root_id, index)));
            } else if let Some(node) = self.find(id) {
                root.children.push(node.clone());
            }
        }
        root
    }
}
