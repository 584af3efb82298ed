/// One of the eight ECMA-48 indexed colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl Color {
    pub fn from_index(idx: u8) -> Self {
        match idx % 8 {
            0 => Color::Black,
            1 => Color::Red,
            2 => Color::Green,
            3 => Color::Yellow,
            4 => Color::Blue,
            5 => Color::Magenta,
            6 => Color::Cyan,
            _ => Color::White,
        }
    }

    pub fn to_index(self) -> u8 {
        self as u8
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::White
    }
}

/// The drawing attributes in effect when a cell was written: colors plus
/// bold/blink. This is the full attribute set the emulator tracks - no
/// italic, underline, strikethrough or RGB/256-color palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAttributes {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub blink: bool,
}

impl Default for CellAttributes {
    fn default() -> Self {
        Self {
            fg: Color::White,
            bg: Color::Black,
            bold: false,
            blink: false,
        }
    }
}

/// One character position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub attrs: CellAttributes,
}

impl Cell {
    pub fn new(ch: char, attrs: CellAttributes) -> Self {
        Self { ch, attrs }
    }

    pub fn blank() -> Self {
        Self {
            ch: ' ',
            attrs: CellAttributes::default(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}
