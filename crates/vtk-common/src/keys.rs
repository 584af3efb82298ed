use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifier: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
    }
}

/// A named, non-printable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Tab,
    BackTab,
    Enter,
    Escape,
    Backspace,
}

/// Either a named key or a bare code point, plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Code(KeyCode),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TKeypress {
    pub key: Key,
    pub modifiers: Modifier,
}

impl TKeypress {
    pub fn new(key: Key, modifiers: Modifier) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifier::empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TInputEvent {
    Keypress(TKeypress),
    MouseDown {
        button: MouseButton,
        x: u16,
        y: u16,
        abs_x: u16,
        abs_y: u16,
    },
    MouseUp {
        button: MouseButton,
        x: u16,
        y: u16,
        abs_x: u16,
        abs_y: u16,
    },
    MouseMotion {
        button: Option<MouseButton>,
        x: u16,
        y: u16,
        abs_x: u16,
        abs_y: u16,
    },
}
