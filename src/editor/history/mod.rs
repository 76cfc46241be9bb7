//! 編集履歴（複合アンドゥ単位へのまとめ込み）
//!
//! バッファの変更通知を受け取り、連続した一文字ずつの入力・削除を
//! ひとつの複合編集にまとめる。まとめ込みの判定はキャレット移動量と
//! バッファ長の変化量がともに ±1 かどうかで行う。

use std::cell::RefCell;
use std::rc::Rc;

use crate::action::SharedAction;
use crate::buffer::{BufferState, ChangeEvent, ChangeListener, TextBuffer};
use crate::error::{HistoryError, Result};

/// 既定の履歴上限（複合編集の数）
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 履歴操作の最小単位
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicEdit {
    Insert {
        offset: usize,
        text: String,
    },
    Remove {
        offset: usize,
        text: String,
        styles: Vec<Option<String>>,
    },
    Attribute {
        offset: usize,
        previous: Vec<Option<String>>,
        style: Option<String>,
    },
}

impl AtomicEdit {
    fn from_event(event: &ChangeEvent) -> Self {
        match event {
            ChangeEvent::Insert { offset, text } => AtomicEdit::Insert {
                offset: *offset,
                text: text.clone(),
            },
            ChangeEvent::Remove {
                offset,
                text,
                styles,
            } => AtomicEdit::Remove {
                offset: *offset,
                text: text.clone(),
                styles: styles.clone(),
            },
            ChangeEvent::Attribute {
                offset,
                previous,
                style,
            } => AtomicEdit::Attribute {
                offset: *offset,
                previous: previous.clone(),
                style: style.clone(),
            },
        }
    }

    fn offset(&self) -> usize {
        match self {
            AtomicEdit::Insert { offset, .. }
            | AtomicEdit::Remove { offset, .. }
            | AtomicEdit::Attribute { offset, .. } => *offset,
        }
    }

    fn revert(&self, buffer: &mut TextBuffer) -> Result<()> {
        match self {
            AtomicEdit::Insert { offset, text } => {
                buffer
                    .remove(*offset, text.chars().count())
                    .map_err(|_| HistoryError::CannotUndo { offset: *offset })?;
            }
            AtomicEdit::Remove {
                offset,
                text,
                styles,
            } => {
                buffer
                    .insert(*offset, text)
                    .map_err(|_| HistoryError::CannotUndo { offset: *offset })?;
                if styles.iter().any(Option::is_some) {
                    buffer
                        .restore_styles(*offset, styles)
                        .map_err(|_| HistoryError::CannotUndo { offset: *offset })?;
                }
            }
            AtomicEdit::Attribute {
                offset, previous, ..
            } => {
                buffer
                    .restore_styles(*offset, previous)
                    .map_err(|_| HistoryError::CannotUndo { offset: *offset })?;
            }
        }
        Ok(())
    }

    fn apply(&self, buffer: &mut TextBuffer) -> Result<()> {
        match self {
            AtomicEdit::Insert { offset, text } => {
                buffer
                    .insert(*offset, text)
                    .map_err(|_| HistoryError::CannotRedo { offset: *offset })?;
            }
            AtomicEdit::Remove { offset, text, .. } => {
                buffer
                    .remove(*offset, text.chars().count())
                    .map_err(|_| HistoryError::CannotRedo { offset: *offset })?;
            }
            AtomicEdit::Attribute {
                offset,
                previous,
                style,
            } => {
                buffer
                    .set_style(*offset, previous.len(), style.as_deref())
                    .map_err(|_| HistoryError::CannotRedo { offset: *offset })?;
            }
        }
        Ok(())
    }
}

/// 複合編集（ひとつのアンドゥ単位）
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundEdit {
    edits: Vec<AtomicEdit>,
    in_progress: bool,
    caret_at_start: usize,
    length_at_start: usize,
}

impl CompoundEdit {
    fn new(state: BufferState) -> Self {
        Self {
            edits: Vec::new(),
            in_progress: true,
            caret_at_start: state.caret,
            length_at_start: state.len,
        }
    }

    /// 編集を追加する。終了済みなら受け付けない
    fn add_edit(&mut self, edit: AtomicEdit) -> bool {
        if !self.in_progress {
            return false;
        }
        self.edits.push(edit);
        true
    }

    fn end(&mut self) {
        self.in_progress = false;
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn edits(&self) -> &[AtomicEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn caret_at_start(&self) -> usize {
        self.caret_at_start
    }

    pub fn length_at_start(&self) -> usize {
        self.length_at_start
    }

    /// 途中で失敗した場合は取り消し済みの編集を適用し直してから返す
    fn undo(&self, buffer: &mut TextBuffer) -> Result<()> {
        for (index, edit) in self.edits.iter().enumerate().rev() {
            if let Err(err) = edit.revert(buffer) {
                for done in &self.edits[index + 1..] {
                    if let Err(restore) = done.apply(buffer) {
                        log::warn!("could not reapply edit at {}: {}", done.offset(), restore);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// 途中で失敗した場合はやり直し済みの編集を取り消してから返す
    fn redo(&self, buffer: &mut TextBuffer) -> Result<()> {
        for (index, edit) in self.edits.iter().enumerate() {
            if let Err(err) = edit.apply(buffer) {
                for done in self.edits[..index].iter().rev() {
                    if let Err(restore) = done.revert(buffer) {
                        log::warn!("could not revert edit at {}: {}", done.offset(), restore);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

/// 履歴の状態（アクションの有効/無効判定に使う）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_units: usize,
    pub redo_units: usize,
    /// 追記中の複合編集があるか
    pub is_open: bool,
}

struct CoalescerState {
    undo: Vec<CompoundEdit>,
    redo: Vec<CompoundEdit>,
    /// `undo` の末尾が追記中か
    open: bool,
    last_caret: usize,
    last_length: usize,
    suspended: bool,
    limit: usize,
    undo_action: Option<SharedAction>,
    redo_action: Option<SharedAction>,
}

impl CoalescerState {
    fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            open: false,
            last_caret: 0,
            last_length: 0,
            suspended: false,
            limit: limit.max(1),
            undo_action: None,
            redo_action: None,
        }
    }

    fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: !self.undo.is_empty(),
            can_redo: !self.redo.is_empty(),
            undo_units: self.undo.len(),
            redo_units: self.redo.len(),
            is_open: self.open,
        }
    }

    fn refresh_actions(&self) {
        let status = self.status();
        for action in [&self.undo_action, &self.redo_action].into_iter().flatten() {
            action.update_from_history(&status);
        }
    }

    fn end_open_unit(&mut self) {
        if self.open {
            if let Some(unit) = self.undo.last_mut() {
                unit.end();
            }
            self.open = false;
        }
    }

    fn start_unit(&mut self, edit: AtomicEdit, state: BufferState, caret: usize) {
        let mut unit = CompoundEdit::new(state);
        unit.add_edit(edit);
        self.undo.push(unit);
        self.redo.clear();
        self.open = true;
        self.last_caret = caret;
        self.last_length = state.len;

        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
    }

    fn append(&mut self, edit: AtomicEdit) -> bool {
        match self.undo.last_mut() {
            Some(unit) => unit.add_edit(edit),
            None => false,
        }
    }

    fn on_change(&mut self, event: &ChangeEvent, state: BufferState) {
        if self.suspended {
            return;
        }

        self.refresh_actions();

        let edit = AtomicEdit::from_event(event);
        let caret = caret_after(event, state);
        if !self.open {
            self.start_unit(edit, state, caret);
        } else if event.is_attribute_only() {
            if !self.append(edit.clone()) {
                self.start_unit(edit, state, caret);
            }
        } else {
            let caret_delta = caret as isize - self.last_caret as isize;
            let length_delta = state.len as isize - self.last_length as isize;

            if caret_delta.abs() == 1 && length_delta.abs() == 1 && self.append(edit.clone()) {
                self.last_caret = caret;
                self.last_length = state.len;
            } else {
                self.end_open_unit();
                self.start_unit(edit, state, caret);
            }
        }

        self.refresh_actions();
    }
}

/// 変更適用後のキャレット位置
///
/// 挿入時のキャレット移動は遅延キュー経由なので、通知時点の値ではなく
/// 変更内容から求める。
fn caret_after(event: &ChangeEvent, state: BufferState) -> usize {
    match event {
        ChangeEvent::Insert { offset, .. } => (offset + event.length()).min(state.len),
        ChangeEvent::Remove { offset, .. } => *offset,
        ChangeEvent::Attribute { .. } => state.caret,
    }
}

/// 編集履歴のまとめ込みマネージャ
///
/// 複製したハンドルは同じ履歴を共有する。ひとつをバッファのリスナーとして
/// 登録し、もうひとつで undo/redo を操作する。
#[derive(Clone)]
pub struct EditCoalescer {
    inner: Rc<RefCell<CoalescerState>>,
}

impl EditCoalescer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CoalescerState::new(limit))),
        }
    }

    /// バッファの変更通知を受け取るよう登録する
    pub fn attach(&self, buffer: &mut TextBuffer) {
        buffer.add_listener(Box::new(self.clone()));
    }

    /// undo/redo アクションを結び付ける（状態変化のたびに更新される）
    pub fn bind_actions(&self, undo: Option<SharedAction>, redo: Option<SharedAction>) {
        let mut state = self.inner.borrow_mut();
        state.undo_action = undo;
        state.redo_action = redo;
        state.refresh_actions();
    }

    pub fn unbind_actions(&self) {
        let mut state = self.inner.borrow_mut();
        state.undo_action = None;
        state.redo_action = None;
    }

    pub fn status(&self) -> HistoryStatus {
        self.inner.borrow().status()
    }

    pub fn can_undo(&self) -> bool {
        self.status().can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.status().can_redo
    }

    pub fn limit(&self) -> usize {
        self.inner.borrow().limit
    }

    /// 取り消し可能な複合編集の複製（古い順）
    pub fn undo_units(&self) -> Vec<CompoundEdit> {
        self.inner.borrow().undo.clone()
    }

    /// 追記中の複合編集を閉じる
    pub fn end_compound(&self) {
        self.inner.borrow_mut().end_open_unit();
    }

    /// 履歴をすべて破棄する
    pub fn discard_all_edits(&self) {
        let mut state = self.inner.borrow_mut();
        state.undo.clear();
        state.redo.clear();
        state.open = false;
        state.refresh_actions();
    }

    /// 直近の複合編集を取り消す
    ///
    /// 取り消す履歴がなければ何もせず `Ok(false)` を返す。
    pub fn undo(&self, buffer: &mut TextBuffer) -> Result<bool> {
        let unit = {
            let mut state = self.inner.borrow_mut();
            state.end_open_unit();
            state.undo.pop()
        };
        let Some(unit) = unit else {
            self.inner.borrow().refresh_actions();
            return Ok(false);
        };

        self.set_suspended(true);
        let result = unit.undo(buffer);
        self.set_suspended(false);

        let mut state = self.inner.borrow_mut();
        let outcome = match result {
            Ok(()) => {
                state.redo.push(unit);
                Ok(true)
            }
            Err(err) => {
                state.undo.push(unit);
                Err(err)
            }
        };
        state.refresh_actions();
        outcome
    }

    /// 直近に取り消した複合編集をやり直す
    pub fn redo(&self, buffer: &mut TextBuffer) -> Result<bool> {
        let unit = self.inner.borrow_mut().redo.pop();
        let Some(unit) = unit else {
            self.inner.borrow().refresh_actions();
            return Ok(false);
        };

        self.set_suspended(true);
        let result = unit.redo(buffer);
        self.set_suspended(false);

        let mut state = self.inner.borrow_mut();
        let outcome = match result {
            Ok(()) => {
                state.undo.push(unit);
                Ok(true)
            }
            Err(err) => {
                state.redo.push(unit);
                Err(err)
            }
        };
        state.refresh_actions();
        outcome
    }

    fn set_suspended(&self, suspended: bool) {
        self.inner.borrow_mut().suspended = suspended;
    }
}

impl Default for EditCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeListener for EditCoalescer {
    fn on_change(&mut self, event: &ChangeEvent, state: BufferState) {
        self.inner.borrow_mut().on_change(event, state);
    }
}

impl std::fmt::Debug for EditCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditCoalescer")
            .field("status", &self.status())
            .finish()
    }
}
