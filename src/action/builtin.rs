//! 組み込みアクション
//!
//! `target-kind = builtin` のノードはターゲット名で固定の実装に対応付ける。
//! 引数を取るターゲットは `名前:引数` の形式で書く（例 `open-recent:/tmp/a.txt`）。

use std::path::PathBuf;

use crate::action::{ActionContext, ActionHandler, ActionRequest, CommandResult, HistoryUpdate};
use crate::editor::HistoryStatus;
use crate::error::{ActionError, Result};
use crate::menu::{MenuNode, NodeKind};

/// 組み込みターゲット名
pub const UNDO: &str = "undo";
pub const REDO: &str = "redo";
pub const NEW_DOCUMENT: &str = "new-document";
pub const CLOSE_DOCUMENT: &str = "close-document";
pub const NEXT_DOCUMENT: &str = "next-document";
pub const PREVIOUS_DOCUMENT: &str = "previous-document";
pub const SELECT_ALL: &str = "select-all";
pub const CLEAR_RECENT_FILES: &str = "clear-recent-files";
pub const OPEN_RECENT: &str = "open-recent";

/// ノードのターゲットから組み込み実装を作成
pub fn create(node: &MenuNode) -> std::result::Result<Box<dyn ActionHandler>, ActionError> {
    let target = node.target.as_deref().ok_or_else(|| ActionError::MissingTarget {
        id: node.id.clone(),
    })?;
    let (name, argument) = match target.split_once(':') {
        Some((name, argument)) => (name, Some(argument)),
        None => (target, None),
    };

    let handler: Box<dyn ActionHandler> = match (name, argument) {
        (UNDO, None) => Box::new(UndoAction),
        (REDO, None) => Box::new(RedoAction),
        (NEW_DOCUMENT, None) => Box::new(NewDocumentAction),
        (CLOSE_DOCUMENT, None) => Box::new(CloseDocumentAction),
        (NEXT_DOCUMENT, None) => Box::new(CycleDocumentAction { forward: true }),
        (PREVIOUS_DOCUMENT, None) => Box::new(CycleDocumentAction { forward: false }),
        (SELECT_ALL, None) => Box::new(SelectAllAction),
        (CLEAR_RECENT_FILES, None) => Box::new(ClearRecentFilesAction),
        (OPEN_RECENT, Some(path)) if !path.is_empty() => Box::new(OpenRecentAction {
            path: PathBuf::from(path),
        }),
        _ => {
            return Err(ActionError::UnknownTarget {
                target: target.to_string(),
            })
        }
    };
    Ok(handler)
}

/// 履歴状態に追従する組み込みターゲットの更新関数
pub fn history_update(node: &MenuNode) -> Option<HistoryUpdate> {
    match node.target.as_deref() {
        Some(UNDO) => Some(can_undo as HistoryUpdate),
        Some(REDO) => Some(can_redo as HistoryUpdate),
        _ => None,
    }
}

fn can_undo(status: &HistoryStatus) -> bool {
    status.can_undo
}

fn can_redo(status: &HistoryStatus) -> bool {
    status.can_redo
}

/// 元に戻す
struct UndoAction;

impl ActionHandler for UndoAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        let Some(document) = ctx.documents.active_mut() else {
            return Ok(CommandResult::error("No active document"));
        };
        if document.undo()? {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::success_with_message("Nothing to undo"))
        }
    }

    fn supports(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Item
    }
}

/// やり直し
struct RedoAction;

impl ActionHandler for RedoAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        let Some(document) = ctx.documents.active_mut() else {
            return Ok(CommandResult::error("No active document"));
        };
        if document.redo()? {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::success_with_message("Nothing to redo"))
        }
    }

    fn supports(&self, kind: NodeKind) -> bool {
        kind == NodeKind::Item
    }
}

struct NewDocumentAction;

impl ActionHandler for NewDocumentAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        let id = ctx.documents.open("untitled");
        ctx.documents.activate(id);
        Ok(CommandResult::success())
    }
}

struct CloseDocumentAction;

impl ActionHandler for CloseDocumentAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        match ctx.documents.active_id() {
            Some(id) => {
                ctx.documents.close(id);
                Ok(CommandResult::success())
            }
            None => Ok(CommandResult::error("No active document")),
        }
    }
}

struct CycleDocumentAction {
    forward: bool,
}

impl ActionHandler for CycleDocumentAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        let moved = if self.forward {
            ctx.documents.activate_next()
        } else {
            ctx.documents.activate_previous()
        };
        if moved {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::success_no_refresh())
        }
    }
}

struct SelectAllAction;

impl ActionHandler for SelectAllAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        match ctx.documents.active_mut() {
            Some(document) => {
                document.select_all();
                Ok(CommandResult::success())
            }
            None => Ok(CommandResult::error("No active document")),
        }
    }
}

struct ClearRecentFilesAction;

impl ActionHandler for ClearRecentFilesAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        ctx.request(ActionRequest::ClearRecentFiles);
        Ok(CommandResult::success())
    }
}

struct OpenRecentAction {
    path: PathBuf,
}

impl ActionHandler for OpenRecentAction {
    fn perform(&mut self, ctx: &mut ActionContext<'_>) -> Result<CommandResult> {
        ctx.request(ActionRequest::OpenRecent(self.path.clone()));
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::TargetKind;

    fn builtin(target: &str) -> MenuNode {
        MenuNode::new("n", NodeKind::Item).with_target(TargetKind::Builtin, target)
    }

    #[test]
    fn test_known_targets_resolve() {
        for target in [UNDO, REDO, NEW_DOCUMENT, CLOSE_DOCUMENT, SELECT_ALL, "open-recent:/tmp/a.txt"] {
            assert!(create(&builtin(target)).is_ok(), "{target}");
        }
    }

    #[test]
    fn test_unknown_and_missing_targets() {
        assert!(matches!(
            create(&builtin("launch-rockets")),
            Err(ActionError::UnknownTarget { .. })
        ));
        assert!(matches!(
            create(&builtin("open-recent:")),
            Err(ActionError::UnknownTarget { .. })
        ));
        assert!(matches!(
            create(&MenuNode::new("n", NodeKind::Item)),
            Err(ActionError::MissingTarget { .. })
        ));
    }

    #[test]
    fn test_history_update_only_for_undo_redo() {
        assert!(history_update(&builtin(UNDO)).is_some());
        assert!(history_update(&builtin(REDO)).is_some());
        assert!(history_update(&builtin(NEW_DOCUMENT)).is_none());
    }
}
