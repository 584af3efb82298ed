//! A small semantic palette consumed by every widget's `draw`.

use vtk_common::{CellAttributes, Color};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub normal: CellAttributes,
    pub selected: CellAttributes,
    pub frame: CellAttributes,
    pub disabled: CellAttributes,
    pub menu: CellAttributes,
    pub menu_selected: CellAttributes,
    pub scrollbar: CellAttributes,
}

impl Default for Theme {
    fn default() -> Self {
        let attr = |fg: Color, bg: Color, bold: bool| CellAttributes { fg, bg, bold, blink: false };
        Self {
            normal: attr(Color::Black, Color::White, false),
            selected: attr(Color::White, Color::Blue, true),
            frame: attr(Color::Black, Color::White, false),
            disabled: attr(Color::White, Color::White, false),
            menu: attr(Color::Black, Color::White, false),
            menu_selected: attr(Color::White, Color::Black, true),
            scrollbar: attr(Color::Black, Color::Cyan, false),
        }
    }
}
