//! アクセラレータ（メニュー項目のショートカットキー）
//!
//! 設定ファイル上の `C-S-z` 形式の表記と crossterm のキーイベントを
//! 同じ内部表現に揃え、キー入力からアクションを引けるようにする。

use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode as CrosstermKeyCode, KeyEvent, KeyModifiers as CrosstermModifiers};

use crate::error::KeyParseError;

/// 修飾キーの組み合わせ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyModifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

/// 基本キーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8),
    Esc,
}

/// メニュー項目に割り当てるキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub modifiers: KeyModifiers,
    pub code: KeyCode,
}

impl Accelerator {
    pub fn new(modifiers: KeyModifiers, code: KeyCode) -> Self {
        Self { modifiers, code }.normalized()
    }

    /// Ctrl+文字
    pub fn ctrl(ch: char) -> Self {
        Self::new(
            KeyModifiers {
                ctrl: true,
                ..KeyModifiers::default()
            },
            KeyCode::Char(ch),
        )
    }

    /// 文字列表現からパース
    ///
    /// `C-` (Ctrl), `M-` (Alt), `S-` (Shift) を任意の順で前置できる。
    pub fn parse(s: &str) -> Result<Self, KeyParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let mut modifiers = KeyModifiers::default();
        let mut remaining = s;

        // 修飾キーの解析。末尾の "-" 単体はキーそのものとして扱う
        while remaining.len() > 2 && remaining.as_bytes()[1] == b'-' {
            match &remaining[..2] {
                "C-" => modifiers.ctrl = true,
                "M-" => modifiers.alt = true,
                "S-" => modifiers.shift = true,
                other => return Err(KeyParseError::UnknownModifier(other.to_string())),
            }
            remaining = &remaining[2..];
        }

        let code = match remaining {
            "Enter" | "RET" => KeyCode::Enter,
            "Backspace" => KeyCode::Backspace,
            "Delete" | "DEL" => KeyCode::Delete,
            "Tab" | "TAB" => KeyCode::Tab,
            "Up" => KeyCode::Up,
            "Down" => KeyCode::Down,
            "Left" => KeyCode::Left,
            "Right" => KeyCode::Right,
            "Home" => KeyCode::Home,
            "End" => KeyCode::End,
            "PageUp" => KeyCode::PageUp,
            "PageDown" => KeyCode::PageDown,
            "Insert" => KeyCode::Insert,
            "Esc" | "ESC" => KeyCode::Esc,
            "SPC" => KeyCode::Char(' '),
            f if f.len() > 1 && f.starts_with('F') => match f[1..].parse::<u8>() {
                Ok(n) if (1..=24).contains(&n) => KeyCode::F(n),
                _ => return Err(KeyParseError::UnknownKey(f.to_string())),
            },
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => KeyCode::Char(ch),
                    _ => return Err(KeyParseError::UnknownKey(other.to_string())),
                }
            }
        };

        Ok(Self::new(modifiers, code))
    }

    /// 大文字は Shift + 小文字に揃える
    fn normalized(mut self) -> Self {
        if let KeyCode::Char(ch) = self.code {
            if ch.is_uppercase() {
                self.modifiers.shift = true;
                self.code = KeyCode::Char(ch.to_lowercase().next().unwrap_or(ch));
            }
        }
        self
    }
}

impl FromStr for Accelerator {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            f.write_str("C-")?;
        }
        if self.modifiers.alt {
            f.write_str("M-")?;
        }
        if self.modifiers.shift {
            f.write_str("S-")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("SPC"),
            KeyCode::Char(ch) => write!(f, "{}", ch),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Delete => f.write_str("Delete"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Up => f.write_str("Up"),
            KeyCode::Down => f.write_str("Down"),
            KeyCode::Left => f.write_str("Left"),
            KeyCode::Right => f.write_str("Right"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PageUp"),
            KeyCode::PageDown => f.write_str("PageDown"),
            KeyCode::Insert => f.write_str("Insert"),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Esc => f.write_str("Esc"),
        }
    }
}

/// crossterm統合
impl TryFrom<KeyEvent> for Accelerator {
    type Error = KeyParseError;

    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        let modifiers = KeyModifiers {
            ctrl: event.modifiers.contains(CrosstermModifiers::CONTROL),
            alt: event.modifiers.contains(CrosstermModifiers::ALT),
            shift: event.modifiers.contains(CrosstermModifiers::SHIFT),
        };

        let code = match event.code {
            CrosstermKeyCode::Char(c) => KeyCode::Char(c),
            CrosstermKeyCode::Enter => KeyCode::Enter,
            CrosstermKeyCode::Backspace => KeyCode::Backspace,
            CrosstermKeyCode::Delete => KeyCode::Delete,
            CrosstermKeyCode::Tab => KeyCode::Tab,
            CrosstermKeyCode::Up => KeyCode::Up,
            CrosstermKeyCode::Down => KeyCode::Down,
            CrosstermKeyCode::Left => KeyCode::Left,
            CrosstermKeyCode::Right => KeyCode::Right,
            CrosstermKeyCode::Home => KeyCode::Home,
            CrosstermKeyCode::End => KeyCode::End,
            CrosstermKeyCode::PageUp => KeyCode::PageUp,
            CrosstermKeyCode::PageDown => KeyCode::PageDown,
            CrosstermKeyCode::Insert => KeyCode::Insert,
            CrosstermKeyCode::F(n) => KeyCode::F(n),
            CrosstermKeyCode::Esc => KeyCode::Esc,
            other => return Err(KeyParseError::UnknownKey(format!("{:?}", other))),
        };

        Ok(Self::new(modifiers, code))
    }
}
