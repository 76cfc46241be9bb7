//! テキストバッファ
//!
//! 文字単位のテキスト、キャレット、文字ごとのスタイルを保持し、
//! 編集のたびに変更イベントをリスナーへ通知する。

use crate::error::buffer::Result;
use crate::error::BufferError;
use crate::ui::dispatch::DeferredQueue;

/// 変更イベント
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// テキスト挿入
    Insert { offset: usize, text: String },
    /// テキスト削除（削除された文字のスタイルも保持）
    Remove {
        offset: usize,
        text: String,
        styles: Vec<Option<String>>,
    },
    /// スタイルのみの変更（内容と長さは変わらない）
    Attribute {
        offset: usize,
        previous: Vec<Option<String>>,
        style: Option<String>,
    },
}

impl ChangeEvent {
    pub fn offset(&self) -> usize {
        match self {
            ChangeEvent::Insert { offset, .. }
            | ChangeEvent::Remove { offset, .. }
            | ChangeEvent::Attribute { offset, .. } => *offset,
        }
    }

    /// 影響範囲の文字数
    pub fn length(&self) -> usize {
        match self {
            ChangeEvent::Insert { text, .. } | ChangeEvent::Remove { text, .. } => {
                text.chars().count()
            }
            ChangeEvent::Attribute { previous, .. } => previous.len(),
        }
    }

    pub fn is_attribute_only(&self) -> bool {
        matches!(self, ChangeEvent::Attribute { .. })
    }
}

/// 通知時点のバッファ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    pub caret: usize,
    pub len: usize,
}

/// 変更通知リスナー
pub trait ChangeListener {
    fn on_change(&mut self, event: &ChangeEvent, state: BufferState);
}

/// テキストバッファ本体
pub struct TextBuffer {
    chars: Vec<char>,
    styles: Vec<Option<String>>,
    caret: usize,
    listeners: Vec<Box<dyn ChangeListener>>,
    deferred: DeferredQueue<TextBuffer>,
}

impl TextBuffer {
    /// 空のバッファを作成
    pub fn new() -> Self {
        Self {
            chars: Vec::new(),
            styles: Vec::new(),
            caret: 0,
            listeners: Vec::new(),
            deferred: DeferredQueue::new(),
        }
    }

    /// 文字列からバッファを作成（通知なし）
    pub fn from_str(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let styles = vec![None; chars.len()];
        Self {
            chars,
            styles,
            ..Self::new()
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// キャレットを移動（末尾でクランプ）
    pub fn set_caret(&mut self, position: usize) {
        self.caret = position.min(self.chars.len());
    }

    pub fn style_at(&self, offset: usize) -> Option<&str> {
        self.styles.get(offset).and_then(|style| style.as_deref())
    }

    pub fn state(&self) -> BufferState {
        BufferState {
            caret: self.caret,
            len: self.chars.len(),
        }
    }

    /// リスナーを追加
    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// 遅延タスク数
    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    /// 遅延タスクを実行し、実行数を返す
    pub fn flush_deferred(&mut self) -> usize {
        let tasks = self.deferred.take();
        let count = tasks.len();
        for task in tasks {
            task(self);
        }
        count
    }

    /// テキストを挿入する
    ///
    /// キャレットは現在のディスパッチ完了後に挿入末尾へ移動する。
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        if offset > self.chars.len() {
            return Err(BufferError::OutOfRange {
                offset,
                len: self.chars.len(),
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        let inserted: Vec<char> = text.chars().collect();
        let count = inserted.len();
        self.chars.splice(offset..offset, inserted);
        self.styles
            .splice(offset..offset, std::iter::repeat(None).take(count));

        let target = offset + count;
        self.deferred.defer(move |buffer: &mut TextBuffer| {
            buffer.set_caret(target);
        });

        self.notify(ChangeEvent::Insert {
            offset,
            text: text.to_string(),
        });
        Ok(())
    }

    /// テキストを削除し、削除した文字列を返す
    ///
    /// キャレットは削除位置へ即座に移動する。
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<String> {
        self.check_range(offset, length)?;
        if length == 0 {
            return Ok(String::new());
        }

        let text: String = self.chars.drain(offset..offset + length).collect();
        let styles: Vec<Option<String>> = self.styles.drain(offset..offset + length).collect();
        self.caret = offset;

        self.notify(ChangeEvent::Remove {
            offset,
            text: text.clone(),
            styles,
        });
        Ok(text)
    }

    /// 範囲に同じスタイルを設定する
    pub fn set_style(&mut self, offset: usize, length: usize, style: Option<&str>) -> Result<()> {
        self.check_range(offset, length)?;
        if length == 0 {
            return Ok(());
        }

        let style = style.map(str::to_string);
        let previous: Vec<Option<String>> = self.styles[offset..offset + length]
            .iter_mut()
            .map(|slot| std::mem::replace(slot, style.clone()))
            .collect();

        self.notify(ChangeEvent::Attribute {
            offset,
            previous,
            style,
        });
        Ok(())
    }

    /// 文字ごとのスタイルを書き戻す（取り消し用）
    pub fn restore_styles(&mut self, offset: usize, styles: &[Option<String>]) -> Result<()> {
        self.check_range(offset, styles.len())?;
        if styles.is_empty() {
            return Ok(());
        }

        let previous: Vec<Option<String>> = self.styles[offset..offset + styles.len()]
            .iter_mut()
            .zip(styles)
            .map(|(slot, style)| std::mem::replace(slot, style.clone()))
            .collect();

        self.notify(ChangeEvent::Attribute {
            offset,
            previous,
            style: None,
        });
        Ok(())
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        let len = self.chars.len();
        if offset > len || length > len - offset {
            return Err(BufferError::RangeOutOfBounds {
                offset,
                length,
                len,
            });
        }
        Ok(())
    }

    fn notify(&mut self, event: ChangeEvent) {
        let state = self.state();
        for listener in &mut self.listeners {
            listener.on_change(&event, state);
        }
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("text", &self.text())
            .field("caret", &self.caret)
            .field("listeners", &self.listeners.len())
            .field("deferred", &self.deferred)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<(ChangeEvent, BufferState)>>>);

    impl ChangeListener for Recorder {
        fn on_change(&mut self, event: &ChangeEvent, state: BufferState) {
            self.0.borrow_mut().push((event.clone(), state));
        }
    }

    #[test]
    fn test_insert_defers_caret() {
        let mut buffer = TextBuffer::new();
        buffer.insert(0, "abc").unwrap();
        assert_eq!(buffer.text(), "abc");
        assert_eq!(buffer.caret(), 0);
        assert_eq!(buffer.pending_tasks(), 1);

        assert_eq!(buffer.flush_deferred(), 1);
        assert_eq!(buffer.caret(), 3);
    }

    #[test]
    fn test_deferred_caret_is_clamped() {
        let mut buffer = TextBuffer::new();
        buffer.insert(0, "abcdef").unwrap();
        buffer.remove(2, 4).unwrap();
        buffer.flush_deferred();
        assert_eq!(buffer.caret(), 2);
    }

    #[test]
    fn test_remove_moves_caret_immediately() {
        let mut buffer = TextBuffer::from_str("hello world");
        buffer.set_caret(11);
        let removed = buffer.remove(5, 6).unwrap();
        assert_eq!(removed, " world");
        assert_eq!(buffer.caret(), 5);
        assert_eq!(buffer.text(), "hello");
    }

    #[test]
    fn test_listener_sees_state_after_edit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut buffer = TextBuffer::from_str("xy");
        buffer.add_listener(Box::new(Recorder(log.clone())));

        buffer.insert(1, "é").unwrap();
        buffer.remove(0, 1).unwrap();

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].1, BufferState { caret: 0, len: 3 });
        assert_eq!(log[0].0.length(), 1);
        assert_eq!(log[1].1, BufferState { caret: 0, len: 2 });
    }

    #[test]
    fn test_style_change_keeps_length() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut buffer = TextBuffer::from_str("fn main");
        buffer.add_listener(Box::new(Recorder(log.clone())));

        buffer.set_style(0, 2, Some("keyword")).unwrap();
        assert_eq!(buffer.style_at(1), Some("keyword"));
        assert_eq!(buffer.len(), 7);

        let log = log.borrow();
        assert!(log[0].0.is_attribute_only());
        assert_eq!(log[0].0.length(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut buffer = TextBuffer::from_str("abc");
        assert_eq!(
            buffer.insert(4, "x"),
            Err(BufferError::OutOfRange { offset: 4, len: 3 })
        );
        assert!(buffer.remove(2, 2).is_err());
        assert!(buffer.set_style(3, 1, None).is_err());
    }
}
