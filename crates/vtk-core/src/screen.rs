//! The double-buffered cell grid and its minimal-diff flush algorithm.
//!
//! `Screen` holds two grids of identical size: `logical`, which widgets draw
//! into, and `physical`, a record of what the last flush actually sent to the
//! terminal. `flush` walks row by row, finds the changed spans, and emits the
//! smallest escape-sequence stream that brings the terminal's picture back in
//! sync with `logical`.

use vtk_common::{Cell, CellAttributes, Color, Rect};

/// A display line always carries exactly this many cells; only the first
/// `width` of them are meaningful for a screen narrower than that.
pub const MAX_LINE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleHeight {
    None,
    Top,
    Bottom,
}

/// Frame style for `Screen::draw_box`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStyle {
    Single,
    Double,
    /// Single verticals, double horizontals - the conventional mixed frame.
    Mixed,
}

/// One row of the display buffer, plus the line-level rendering flags a real
/// VT220 tracks (DECDWL/DECDHL, and the screen-reverse-video snapshot taken
/// when the line was created so scrolled-off lines keep their look).
#[derive(Debug, Clone)]
pub struct DisplayLine {
    cells: Vec<Cell>,
    pub double_width: bool,
    pub double_height: DoubleHeight,
    pub reverse_color: bool,
}

impl DisplayLine {
    pub fn blank(reverse_color: bool) -> Self {
        Self {
            cells: vec![Cell::blank(); MAX_LINE],
            double_width: false,
            double_height: DoubleHeight::None,
            reverse_color,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, x: usize) -> Cell {
        self.cells[x.min(MAX_LINE - 1)]
    }

    pub fn set_cell(&mut self, x: usize, cell: Cell) {
        if x < MAX_LINE {
            self.cells[x] = cell;
        }
    }
}

/// A double-buffered character grid with clip/offset support and a minimal
/// escape-sequence diff on flush.
pub struct Screen {
    width: u16,
    height: u16,
    logical: Vec<Vec<Cell>>,
    physical: Vec<Vec<Cell>>,
    dirty: bool,
    really_cleared: bool,
    pub offset_x: i16,
    pub offset_y: i16,
    clip_x: u16,
    clip_y: u16,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        let mut s = Self {
            width,
            height,
            logical: Vec::new(),
            physical: Vec::new(),
            dirty: false,
            really_cleared: true,
            offset_x: 0,
            offset_y: 0,
            clip_x: width,
            clip_y: height,
        };
        s.alloc();
        s
    }

    fn alloc(&mut self) {
        let row = vec![Cell::blank(); self.width as usize];
        self.logical = vec![row.clone(); self.height as usize];
        self.physical = vec![row; self.height as usize];
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_clip(&mut self, clip_x: u16, clip_y: u16) {
        self.clip_x = clip_x;
        self.clip_y = clip_y;
    }

    pub fn clip_rect(&self) -> Rect {
        Rect::new(0, 0, self.clip_x, self.clip_y)
    }

    /// Reallocate both grids to the new size and force a full redraw.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.clip_x = width;
        self.clip_y = height;
        self.alloc();
        self.really_cleared = true;
        self.dirty = true;
    }

    /// Blank the logical grid and reset offset/clip without reallocating.
    pub fn reset(&mut self) {
        for row in &mut self.logical {
            for cell in row.iter_mut() {
                *cell = Cell::blank();
            }
        }
        self.offset_x = 0;
        self.offset_y = 0;
        self.clip_x = self.width;
        self.clip_y = self.height;
        self.dirty = true;
    }

    fn in_clip(&self, x: u16, y: u16) -> bool {
        x < self.clip_x && y < self.clip_y
    }

    fn to_absolute(&self, x: u16, y: u16) -> Option<(usize, usize)> {
        let ax = x as i32 + self.offset_x as i32;
        let ay = y as i32 + self.offset_y as i32;
        if ax < 0 || ay < 0 || ax >= self.width as i32 || ay >= self.height as i32 {
            None
        } else {
            Some((ax as usize, ay as usize))
        }
    }

    pub fn put_char(&mut self, x: u16, y: u16, ch: char, attrs: CellAttributes) {
        if !self.in_clip(x, y) {
            return;
        }
        if let Some((ax, ay)) = self.to_absolute(x, y) {
            self.logical[ay][ax] = Cell::new(ch, attrs);
            self.dirty = true;
        }
    }

    pub fn put_str(&mut self, x: u16, y: u16, s: &str, attrs: CellAttributes) {
        let mut col = x;
        for ch in s.chars() {
            if col >= self.clip_x {
                break;
            }
            self.put_char(col, y, ch, attrs);
            col += 1;
        }
    }

    /// Change only the attributes of a cell, leaving its glyph intact.
    pub fn put_attr(&mut self, x: u16, y: u16, attrs: CellAttributes) {
        if !self.in_clip(x, y) {
            return;
        }
        if let Some((ax, ay)) = self.to_absolute(x, y) {
            self.logical[ay][ax].attrs = attrs;
            self.dirty = true;
        }
    }

    pub fn hline(&mut self, x: u16, y: u16, len: u16, ch: char, attrs: CellAttributes) {
        for i in 0..len {
            self.put_char(x + i, y, ch, attrs);
        }
    }

    pub fn vline(&mut self, x: u16, y: u16, len: u16, ch: char, attrs: CellAttributes) {
        for i in 0..len {
            self.put_char(x, y + i, ch, attrs);
        }
    }

    /// Draw a frame in one of three border styles, with an optional
    /// interior background fill and an optional shadow drawn two cells
    /// right and one cell down of the frame, ignoring the clip rectangle
    /// (so a window's shadow can fall over a sibling without being clipped
    /// to the casting window's own bounds).
    pub fn draw_box(
        &mut self,
        rect: Rect,
        attrs: CellAttributes,
        style: BorderStyle,
        fill: Option<CellAttributes>,
        shadow: bool,
    ) {
        if rect.w < 2 || rect.h < 2 {
            return;
        }
        let (tl, tr, bl, br, horiz, vert) = match style {
            BorderStyle::Single => ('\u{250C}', '\u{2510}', '\u{2514}', '\u{2518}', '\u{2500}', '\u{2502}'),
            BorderStyle::Double => ('\u{2554}', '\u{2557}', '\u{255A}', '\u{255D}', '\u{2550}', '\u{2551}'),
            // single verticals, double horizontals - the conventional mixed
            // frame, with the matching single/double corner glyphs
            BorderStyle::Mixed => ('\u{2552}', '\u{2555}', '\u{2558}', '\u{255B}', '\u{2550}', '\u{2502}'),
        };
        self.put_char(rect.x, rect.y, tl, attrs);
        self.put_char(rect.x + rect.w - 1, rect.y, tr, attrs);
        self.put_char(rect.x, rect.y + rect.h - 1, bl, attrs);
        self.put_char(rect.x + rect.w - 1, rect.y + rect.h - 1, br, attrs);
        self.hline(rect.x + 1, rect.y, rect.w - 2, horiz, attrs);
        self.hline(rect.x + 1, rect.y + rect.h - 1, rect.w - 2, horiz, attrs);
        self.vline(rect.x, rect.y + 1, rect.h - 2, vert, attrs);
        self.vline(rect.x + rect.w - 1, rect.y + 1, rect.h - 2, vert, attrs);
        if let Some(fill_attrs) = fill {
            for row in 1..rect.h - 1 {
                for col in 1..rect.w - 1 {
                    self.put_char(rect.x + col, rect.y + row, ' ', fill_attrs);
                }
            }
        }

        if shadow {
            let shadow_attrs = CellAttributes {
                fg: Color::Black,
                bg: Color::Black,
                bold: false,
                blink: false,
            };
            let saved_clip = (self.clip_x, self.clip_y);
            self.clip_x = self.width;
            self.clip_y = self.height;
            for row in 1..=rect.h {
                self.put_char(rect.x + rect.w, rect.y + row, ' ', shadow_attrs);
                self.put_char(rect.x + rect.w + 1, rect.y + row, ' ', shadow_attrs);
            }
            for col in 2..rect.w + 2 {
                self.put_char(rect.x + col, rect.y + rect.h, ' ', shadow_attrs);
            }
            self.clip_x = saved_clip.0;
            self.clip_y = saved_clip.1;
        }
    }

    fn scan_text_bounds(row: &[Cell]) -> Option<(usize, usize)> {
        let begin = row.iter().position(|c| *c != Cell::blank())?;
        let end = row.iter().rposition(|c| *c != Cell::blank()).map(|i| i + 1)?;
        Some((begin, end))
    }

    /// Compute the escape-sequence bytes that bring the terminal's picture
    /// in line with `logical`, then copy `logical` onto `physical`.
    pub fn flush(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.really_cleared {
            out.extend_from_slice(b"\x1b[2J");
        }

        let mut last_attrs: Option<CellAttributes> = None;
        let mut wrote_any = false;

        for y in 0..self.height as usize {
            let (text_begin, text_end) = match Self::scan_text_bounds(&self.logical[y]) {
                Some(bounds) => bounds,
                None => continue,
            };

            let mut cursor_positioned = false;
            let mut x = text_begin;
            while x < self.width as usize {
                let changed = self.really_cleared || self.logical[y][x] != self.physical[y][x];
                if x >= text_end {
                    if changed || !cursor_positioned {
                        // nothing further to draw on this row past text_end
                    }
                    break;
                }
                if !changed {
                    x += 1;
                    cursor_positioned = false;
                    continue;
                }

                if !cursor_positioned {
                    out.extend_from_slice(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes());
                    if x > text_begin {
                        out.extend_from_slice(b"\x1b[1K");
                    }
                    cursor_positioned = true;
                }

                let cell = self.logical[y][x];
                if !wrote_any {
                    out.extend_from_slice(b"\x1b[0m");
                    wrote_any = true;
                    last_attrs = None;
                }
                Self::emit_sgr_delta(&mut out, last_attrs, cell.attrs);
                last_attrs = Some(cell.attrs);

                let mut buf = [0u8; 4];
                out.extend_from_slice(cell.ch.encode_utf8(&mut buf).as_bytes());
                self.physical[y][x] = cell;
                x += 1;
            }

            if text_end < self.width as usize {
                if !cursor_positioned {
                    out.extend_from_slice(format!("\x1b[{};{}H", y + 1, text_end + 1).as_bytes());
                }
                out.extend_from_slice(b"\x1b[K");
            }
            for x in text_begin..text_end {
                self.physical[y][x] = self.logical[y][x];
            }
        }

        self.dirty = false;
        self.really_cleared = false;
        out
    }

    fn emit_sgr_delta(out: &mut Vec<u8>, prev: Option<CellAttributes>, cur: CellAttributes) {
        let Some(prev) = prev else {
            out.extend_from_slice(
                format!(
                    "\x1b[0;{};{}{}{}m",
                    30 + cur.fg.to_index(),
                    40 + cur.bg.to_index(),
                    if cur.bold { ";1" } else { "" },
                    if cur.blink { ";5" } else { "" }
                )
                .as_bytes(),
            );
            return;
        };
        if prev == cur {
            return;
        }
        if prev.bold != cur.bold || prev.blink != cur.blink {
            // an attribute-class change can't be expressed incrementally
            // without first resetting, since there is no "turn off bold"
            // code distinct from the generic reset in this color model
            out.extend_from_slice(
                format!(
                    "\x1b[0;{};{}{}{}m",
                    30 + cur.fg.to_index(),
                    40 + cur.bg.to_index(),
                    if cur.bold { ";1" } else { "" },
                    if cur.blink { ";5" } else { "" }
                )
                .as_bytes(),
            );
            return;
        }
        match (prev.fg != cur.fg, prev.bg != cur.bg) {
            (true, true) => {
                out.extend_from_slice(
                    format!("\x1b[{};{}m", 30 + cur.fg.to_index(), 40 + cur.bg.to_index()).as_bytes(),
                );
            }
            (true, false) => {
                out.extend_from_slice(format!("\x1b[{}m", 30 + cur.fg.to_index()).as_bytes());
            }
            (false, true) => {
                out.extend_from_slice(format!("\x1b[{}m", 40 + cur.bg.to_index()).as_bytes());
            }
            (false, false) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_then_flush_is_idempotent() {
        let mut s = Screen::new(10, 2);
        s.put_str(0, 0, "hi", CellAttributes::default());
        let _ = s.flush();
        let second = s.flush();
        assert!(second.is_empty() || second == b"\x1b[2J");
    }

    #[test]
    fn unchanged_grid_flushes_empty_after_first_flush() {
        let mut s = Screen::new(10, 2);
        s.put_str(0, 0, "hi", CellAttributes::default());
        let _ = s.flush();
        s.put_str(0, 0, "hi", CellAttributes::default());
        let out = s.flush();
        assert!(out.is_empty());
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut s = Screen::new(10, 2);
        let _ = s.flush();
        s.resize(12, 3);
        s.put_char(0, 0, 'x', CellAttributes::default());
        let out = s.flush();
        assert!(out.starts_with(b"\x1b[2J"));
    }

    #[test]
    fn put_char_outside_clip_is_ignored() {
        let mut s = Screen::new(10, 2);
        s.set_clip(3, 3);
        s.put_char(5, 0, 'z', CellAttributes::default());
        let out = s.flush();
        assert!(!out.contains(&b'z'));
    }
}
