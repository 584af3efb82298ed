//! The cursor/charset/attribute subset covered by DECSC/DECRC.

use vtk_common::{CellAttributes, CharacterSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsSlot {
    G0,
    G1,
    G2,
    G3,
}

#[derive(Debug, Clone)]
pub struct SaveableState {
    pub origin_mode: bool,
    pub cursor_x: u16,
    pub cursor_y: u16,
    pub g: [CharacterSet; 4],
    pub gl: GraphicsSlot,
    pub gr: GraphicsSlot,
    pub attrs: CellAttributes,
}

impl Default for SaveableState {
    fn default() -> Self {
        Self {
            origin_mode: false,
            cursor_x: 0,
            cursor_y: 0,
            g: [CharacterSet::UsAscii; 4],
            gl: GraphicsSlot::G0,
            gr: GraphicsSlot::G1,
            attrs: CellAttributes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_power_on_state() {
        let s = SaveableState::default();
        assert!(!s.origin_mode);
        assert_eq!(s.cursor_x, 0);
        assert_eq!(s.cursor_y, 0);
        assert_eq!(s.gl, GraphicsSlot::G0);
    }
}
