//! アクション生成
//!
//! ノードの種別とターゲット種別から実装を選ぶ。
//! * builtin: 組み込みターゲット表
//! * custom: 名前で登録されたファクトリ表（生成失敗はエラーとして返す）
//! * それ以外: 汎用ラッパー
//!
//! ツールノード（provided-tool / custom-tool）は常にツール実行アクションになる。

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::action::{builtin, Action, ActionContext, ActionHandler, ActionRequest, CommandResult};
use crate::error::{ActionError, Result};
use crate::menu::{MenuNode, NodeKind, TargetKind};

/// カスタムアクションのファクトリ
pub type CustomFactory =
    Box<dyn Fn(&MenuNode) -> std::result::Result<Box<dyn ActionHandler>, ActionError>>;

/// ファクトリ表
#[derive(Default)]
pub struct ActionFactories {
    custom: HashMap<String, CustomFactory>,
}

impl ActionFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// カスタムターゲットを登録（同名は置き換え）
    pub fn register_custom<F>(&mut self, target: impl Into<String>, factory: F)
    where
        F: Fn(&MenuNode) -> std::result::Result<Box<dyn ActionHandler>, ActionError> + 'static,
    {
        self.custom.insert(target.into(), Box::new(factory));
    }

    /// ノードに対応するアクションを生成する
    ///
    /// アクションを必要としない種別（メニュー、区切り線、ルート）は `Ok(None)`。
    pub fn create(
        &self,
        node: &MenuNode,
        group: Option<String>,
    ) -> std::result::Result<Option<Action>, ActionError> {
        if !node.kind.requires_action() {
            return Ok(None);
        }

        let handler: Box<dyn ActionHandler> = match node.kind {
            NodeKind::ProvidedTool | NodeKind::CustomTool => Box::new(ToolAction::new(node)?),
            _ => match node.target_kind {
                TargetKind::Builtin => builtin::create(node)?,
                TargetKind::Custom => self.construct_custom(node)?,
                TargetKind::Default => Box::new(DefaultAction::new(node)),
            },
        };

        if !handler.supports(node.kind) {
            return Err(ActionError::CapabilityMismatch {
                id: node.id.clone(),
            });
        }

        let mut action = Action::from_node(node, handler).with_group(group);
        if node.target_kind == TargetKind::Builtin {
            if let Some(update) = builtin::history_update(node) {
                action = action.with_history_update(update);
            }
        }
        Ok(Some(action))
    }

    fn construct_custom(
        &self,
        node: &MenuNode,
    ) -> std::result::Result<Box<dyn ActionHandler>, ActionError> {
        let target = node.target.as_deref().ok_or_else(|| ActionError::MissingTarget {
            id: node.id.clone(),
        })?;
        let factory = self
            .custom
            .get(target)
            .ok_or_else(|| ActionError::UnknownTarget {
                target: target.to_string(),
            })?;

        match panic::catch_unwind(AssertUnwindSafe(|| factory(node))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "constructor panicked".to_string());
                Err(ActionError::Construction {
                    target: target.to_string(),
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for ActionFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<&String> = self.custom.keys().collect();
        targets.sort();
        f.debug_struct("ActionFactories")
            .field("custom", &targets)
            .finish()
    }
}

/// 外部ツールの実行依頼を出すアクション
struct ToolAction {
    tool_id: String,
    command: String,
    provided: bool,
}

impl ToolAction {
    fn new(node: &MenuNode) -> std::result::Result<Self, ActionError> {
        let command = node.target.clone().ok_or_else(|| ActionError::MissingTarget {
            id: node.id.clone(),
        })?;
        Ok(Self {
            tool_id: node.id.clone(),
            command,
            provided: node.kind == NodeKind::ProvidedTool,
        })
    }
}

impl ActionHandler for ToolAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        ctx.request(ActionRequest::RunTool {
            tool_id: self.tool_id.clone(),
            command: self.command.clone(),
            provided: self.provided,
        });
        Ok(CommandResult::success_with_message(format!("Running {}", self.command)))
    }
}

/// 汎用ラッパー：UI側へ通知するだけ
struct DefaultAction {
    id: String,
    target: Option<String>,
}

impl DefaultAction {
    fn new(node: &MenuNode) -> Self {
        Self {
            id: node.id.clone(),
            target: node.target.clone(),
        }
    }
}

impl ActionHandler for DefaultAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        ctx.request(ActionRequest::Dispatch {
            id: self.id.clone(),
            target: self.target.clone(),
        });
        Ok(CommandResult::success_no_refresh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl ActionHandler for Noop {
        fn perform(&mut self, _ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
            Ok(CommandResult::success())
        }

        fn supports(&self, kind: NodeKind) -> bool {
            kind != NodeKind::Radio
        }
    }

    fn custom(id: &str, kind: NodeKind, target: &str) -> MenuNode {
        MenuNode::new(id, kind).with_target(TargetKind::Custom, target)
    }

    #[test]
    fn test_non_action_kinds_produce_nothing() {
        let factories = ActionFactories::new();
        for kind in [NodeKind::Root, NodeKind::Menu, NodeKind::Separator] {
            assert!(factories.create(&MenuNode::new("x", kind), None).unwrap().is_none());
        }
    }

    #[test]
    fn test_custom_factory_lookup() {
        let mut factories = ActionFactories::new();
        factories.register_custom("plugins.Noop", |_node| Ok(Box::new(Noop) as Box<dyn ActionHandler>));

        let action = factories
            .create(&custom("p.noop", NodeKind::Item, "plugins.Noop"), None)
            .unwrap()
            .unwrap();
        assert_eq!(action.id(), "p.noop");

        assert!(matches!(
            factories.create(&custom("p.other", NodeKind::Item, "plugins.Missing"), None),
            Err(ActionError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_custom_factory_failures_become_errors() {
        let mut factories = ActionFactories::new();
        factories.register_custom("plugins.Fails", |node| {
            Err(ActionError::Construction {
                target: "plugins.Fails".into(),
                message: format!("cannot build {}", node.id),
            })
        });
        factories.register_custom("plugins.Panics", |_node| panic!("boom"));
        factories.register_custom("plugins.Noop", |_node| Ok(Box::new(Noop) as Box<dyn ActionHandler>));

        assert!(matches!(
            factories.create(&custom("a", NodeKind::Item, "plugins.Fails"), None),
            Err(ActionError::Construction { .. })
        ));
        match factories.create(&custom("b", NodeKind::Item, "plugins.Panics"), None) {
            Err(ActionError::Construction { message, .. }) => assert_eq!(message, "boom"),
            other => panic!("expected construction error, got {:?}", other.map(|a| a.map(|a| a.id().to_string()))),
        }
        assert!(matches!(
            factories.create(&custom("c", NodeKind::Radio, "plugins.Noop"), None),
            Err(ActionError::CapabilityMismatch { .. })
        ));
    }

    #[test]
    fn test_tool_nodes_request_tool_runs() {
        let factories = ActionFactories::new();
        let node = MenuNode::new("tools.custom.fmt", NodeKind::CustomTool).with_target(TargetKind::Default, "rustfmt");
        let action = factories.create(&node, None).unwrap().unwrap();

        let mut documents = crate::editor::DocumentSet::new();
        let mut requests = Vec::new();
        action
            .perform(&mut ActionContext::new(&mut documents, &mut requests))
            .unwrap();
        assert_eq!(
            requests,
            vec![ActionRequest::RunTool {
                tool_id: "tools.custom.fmt".into(),
                command: "rustfmt".into(),
                provided: false,
            }]
        );
    }

    #[test]
    fn test_builtin_undo_tracks_history() {
        let factories = ActionFactories::new();
        let node = MenuNode::new("edit.undo", NodeKind::Item).with_target(TargetKind::Builtin, "undo");
        let action = factories.create(&node, None).unwrap().unwrap();
        action.update_from_history(&crate::editor::HistoryStatus::default());
        assert!(!action.is_enabled());
    }
}
