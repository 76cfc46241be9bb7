//! ドキュメント管理
//!
//! ドキュメントはテキストバッファとその編集履歴を組で持つ。
//! ドキュメント集合はタブの並び順とアクティブなドキュメントを管理し、
//! 切り替えのたびに undo/redo アクションを新しい履歴へ結び直す。

use std::path::{Path, PathBuf};

use crate::action::SharedAction;
use crate::buffer::TextBuffer;
use crate::editor::history::{EditCoalescer, HistoryStatus, DEFAULT_HISTORY_LIMIT};
use crate::error::buffer;
use crate::error::Result;

/// ドキュメントの一意識別子
pub type DocumentId = usize;

/// 単一のドキュメント
pub struct Document {
    id: DocumentId,
    title: String,
    path: Option<PathBuf>,
    buffer: TextBuffer,
    history: EditCoalescer,
    selection: Option<(usize, usize)>,
}

impl Document {
    pub fn new(id: DocumentId, title: impl Into<String>, text: &str, history_limit: usize) -> Self {
        let mut buffer = TextBuffer::from_str(text);
        let history = EditCoalescer::with_limit(history_limit);
        history.attach(&mut buffer);
        Self {
            id,
            title: title.into(),
            path: None,
            buffer,
            history,
            selection: None,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn history(&self) -> &EditCoalescer {
        &self.history
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn caret(&self) -> usize {
        self.buffer.caret()
    }

    /// 取り消せる編集があれば変更ありとみなす
    pub fn is_modified(&self) -> bool {
        self.history.can_undo()
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    /// 1文字ずつキャレット位置へ入力する（1文字ごとにディスパッチが完了する）
    pub fn type_text(&mut self, text: &str) -> buffer::Result<()> {
        self.selection = None;
        for ch in text.chars() {
            let caret = self.buffer.caret();
            let mut encoded = [0u8; 4];
            self.buffer.insert(caret, ch.encode_utf8(&mut encoded))?;
            self.buffer.flush_deferred();
        }
        Ok(())
    }

    /// まとめてキャレット位置へ貼り付ける
    pub fn paste(&mut self, text: &str) -> buffer::Result<()> {
        self.selection = None;
        let caret = self.buffer.caret();
        self.buffer.insert(caret, text)?;
        self.buffer.flush_deferred();
        Ok(())
    }

    /// キャレット直前の1文字を削除する
    pub fn backspace(&mut self) -> buffer::Result<bool> {
        self.selection = None;
        let caret = self.buffer.caret();
        if caret == 0 {
            return Ok(false);
        }
        self.buffer.remove(caret - 1, 1)?;
        Ok(true)
    }

    pub fn set_style(&mut self, offset: usize, length: usize, style: Option<&str>) -> buffer::Result<()> {
        self.buffer.set_style(offset, length, style)
    }

    pub fn select_all(&mut self) {
        let len = self.buffer.len();
        self.selection = Some((0, len));
        self.buffer.set_caret(len);
    }

    /// 直近の編集単位を取り消す（履歴が空なら `Ok(false)`）
    pub fn undo(&mut self) -> Result<bool> {
        self.selection = None;
        self.history.undo(&mut self.buffer)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.selection = None;
        self.history.redo(&mut self.buffer)
    }

    pub fn flush_deferred(&mut self) -> usize {
        self.buffer.flush_deferred()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("len", &self.buffer.len())
            .field("history", &self.history)
            .finish()
    }
}

/// 複数のドキュメントを管理する構造体
#[derive(Debug)]
pub struct DocumentSet {
    /// タブ順に並んだドキュメント
    documents: Vec<Document>,
    active: Option<DocumentId>,
    next_id: DocumentId,
    history_limit: usize,
    undo_action: Option<SharedAction>,
    redo_action: Option<SharedAction>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            documents: Vec::new(),
            active: None,
            next_id: 0,
            history_limit,
            undo_action: None,
            redo_action: None,
        }
    }

    /// 空のドキュメントを作成し、IDを返す
    pub fn open(&mut self, title: impl Into<String>) -> DocumentId {
        self.open_with_text(title, "")
    }

    /// 内容付きでドキュメントを作成する
    ///
    /// 最初のドキュメントは自動的にアクティブになる。
    pub fn open_with_text(&mut self, title: impl Into<String>, text: &str) -> DocumentId {
        let id = self.next_id;
        self.next_id += 1;
        self.documents
            .push(Document::new(id, title, text, self.history_limit));

        if self.active.is_none() {
            self.activate(id);
        }
        id
    }

    /// ファイル由来のドキュメントを作成する（タイトルはファイル名）
    pub fn open_file(&mut self, path: &Path, text: &str) -> DocumentId {
        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = self.open_with_text(title, text);
        if let Some(document) = self.get_mut(id) {
            document.path = Some(path.to_path_buf());
        }
        id
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// タブ順のID
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(Document::id).collect()
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|document| document.id == id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|document| document.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<DocumentId> {
        self.documents
            .iter()
            .find(|document| document.path() == Some(path))
            .map(Document::id)
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Document> {
        match self.active {
            Some(id) => self.get_mut(id),
            None => None,
        }
    }

    /// アクティブなドキュメントを切り替える
    pub fn activate(&mut self, id: DocumentId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if let Some(previous) = self.active() {
            previous.history().unbind_actions();
        }
        self.active = Some(id);
        self.rebind_actions();
        true
    }

    /// ドキュメントを閉じる
    ///
    /// アクティブなドキュメントを閉じた場合は同じ位置（なければ直前）の
    /// ドキュメントがアクティブになる。
    pub fn close(&mut self, id: DocumentId) -> Option<Document> {
        let index = self.documents.iter().position(|document| document.id == id)?;
        let removed = self.documents.remove(index);
        removed.history().unbind_actions();

        if self.active == Some(id) {
            self.active = None;
            let neighbour = index.min(self.documents.len().saturating_sub(1));
            match self.documents.get(neighbour).map(Document::id) {
                Some(next) => {
                    self.activate(next);
                }
                None => self.rebind_actions(),
            }
        }
        Some(removed)
    }

    pub fn activate_next(&mut self) -> bool {
        self.cycle(1)
    }

    pub fn activate_previous(&mut self) -> bool {
        self.cycle(self.documents.len().saturating_sub(1))
    }

    fn cycle(&mut self, step: usize) -> bool {
        let count = self.documents.len();
        if count < 2 {
            return false;
        }
        let Some(current) = self
            .active
            .and_then(|id| self.documents.iter().position(|document| document.id == id))
        else {
            return false;
        };
        let next = self.documents[(current + step) % count].id;
        self.activate(next)
    }

    /// undo/redo アクションを結び付ける（アクティブなドキュメントの履歴に追従する）
    pub fn bind_history_actions(&mut self, undo: Option<SharedAction>, redo: Option<SharedAction>) {
        self.undo_action = undo;
        self.redo_action = redo;
        self.rebind_actions();
    }

    fn rebind_actions(&self) {
        match self.active() {
            Some(document) => document
                .history()
                .bind_actions(self.undo_action.clone(), self.redo_action.clone()),
            None => {
                let status = HistoryStatus::default();
                for action in [&self.undo_action, &self.redo_action].into_iter().flatten() {
                    action.update_from_history(&status);
                }
            }
        }
    }

    /// 全ドキュメントの遅延タスクを実行する
    pub fn flush_deferred(&mut self) -> usize {
        self.documents
            .iter_mut()
            .map(Document::flush_deferred)
            .sum()
    }
}

impl Default for DocumentSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{builtin, ActionFactories};
    use crate::menu::{MenuNode, NodeKind, TargetKind};
    use std::rc::Rc;

    fn history_action(target: &str) -> SharedAction {
        let node = MenuNode::new(format!("edit.{}", target), NodeKind::Item)
            .with_target(TargetKind::Builtin, target);
        Rc::new(ActionFactories::new().create(&node, None).unwrap().unwrap())
    }

    #[test]
    fn test_first_document_becomes_active() {
        let mut documents = DocumentSet::new();
        assert!(documents.active().is_none());
        let first = documents.open("a");
        let second = documents.open("b");
        assert_eq!(documents.active_id(), Some(first));
        assert!(documents.activate(second));
        assert!(!documents.activate(99));
        assert_eq!(documents.active().unwrap().title(), "b");
    }

    #[test]
    fn test_cycle_wraps() {
        let mut documents = DocumentSet::new();
        let a = documents.open("a");
        let b = documents.open("b");
        let c = documents.open("c");

        assert!(documents.activate_next());
        assert_eq!(documents.active_id(), Some(b));
        documents.activate(c);
        assert!(documents.activate_next());
        assert_eq!(documents.active_id(), Some(a));
        assert!(documents.activate_previous());
        assert_eq!(documents.active_id(), Some(c));
    }

    #[test]
    fn test_close_activates_neighbour() {
        let mut documents = DocumentSet::new();
        let a = documents.open("a");
        let b = documents.open("b");
        documents.activate(b);

        assert!(documents.close(b).is_some());
        assert_eq!(documents.active_id(), Some(a));
        documents.close(a);
        assert!(documents.active_id().is_none());
        assert!(documents.close(a).is_none());
    }

    #[test]
    fn test_actions_follow_active_history() {
        let mut documents = DocumentSet::new();
        let undo = history_action(builtin::UNDO);
        let redo = history_action(builtin::REDO);
        let first = documents.open("a");
        let second = documents.open("b");
        documents.bind_history_actions(Some(undo.clone()), Some(redo.clone()));
        assert!(!undo.is_enabled());

        documents.active_mut().unwrap().type_text("hi").unwrap();
        assert!(undo.is_enabled());

        documents.activate(second);
        assert!(!undo.is_enabled());

        // 非アクティブな履歴の変化はアクションに影響しない
        documents.get_mut(first).unwrap().undo().unwrap();
        assert!(!redo.is_enabled());

        documents.activate(first);
        assert!(redo.is_enabled());
        assert!(!undo.is_enabled());
    }

    #[test]
    fn test_document_editing_helpers() {
        let mut document = Document::new(0, "notes", "", DEFAULT_HISTORY_LIMIT);
        document.type_text("abc").unwrap();
        document.paste("XYZ").unwrap();
        assert_eq!(document.text(), "abcXYZ");
        assert_eq!(document.caret(), 6);

        assert!(document.undo().unwrap());
        assert_eq!(document.text(), "abc");
        assert!(document.backspace().unwrap());
        assert_eq!(document.text(), "ab");

        document.select_all();
        assert_eq!(document.selection(), Some((0, 2)));
        assert_eq!(document.caret(), 2);
    }
}
