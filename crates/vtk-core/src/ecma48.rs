//! The ECMA-48 / VT100-VT220 / XTerm emulator: the heaviest single piece of
//! this toolkit. Owns the scrollback-backed display buffer and the full
//! parser/dispatch table; everything byte-level is delegated to
//! `vtk_parser::VtParser`, which runs the canonical ANSI state machine.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};
use vtk_common::{
    charset, CellAttributes, CharacterSet, Color, Key, KeyCode, Modifier, NrcSet, TKeypress,
};
use vtk_parser::{ParserEvent, VtParser};

use crate::saveable::{GraphicsSlot, SaveableState};
use crate::screen::DisplayLine;

pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Vt100,
    Vt102,
    Vt220,
    XTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKeyMode {
    Ansi,
    Vt52,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vt52State {
    Ground,
    ExpectCursorRow,
    ExpectCursorCol(u16),
}

/// The full emulator: display buffer, scrollback, parser state, modes.
pub struct Ecma48 {
    device: DeviceType,
    width: u16,
    height: u16,
    display: Vec<DisplayLine>,
    scrollback: VecDeque<DisplayLine>,
    scrollback_max: usize,
    scroll_top: u16,
    scroll_bottom: u16,
    right_margin: u16,
    wrap_pending: bool,
    insert_mode: bool,
    vt52_mode: bool,
    vt52_state: Vt52State,
    reverse_video: bool,
    col_132: bool,
    new_line_mode: bool,
    arrow_key_mode: ArrowKeyMode,
    application_keypad: bool,
    s8c1t: bool,
    tab_stops: Vec<u16>,
    cursor_visible: bool,
    single_shift: Option<GraphicsSlot>,
    current: SaveableState,
    saved: Option<SaveableState>,
    answerback: String,
    parser: VtParser,
    pending_reply: Vec<u8>,
}

impl Ecma48 {
    pub fn new(width: u16, height: u16, device: DeviceType) -> Self {
        let mut e = Self {
            device,
            width,
            height,
            display: Vec::new(),
            scrollback: VecDeque::with_capacity(DEFAULT_SCROLLBACK_LINES.min(4096)),
            scrollback_max: DEFAULT_SCROLLBACK_LINES,
            scroll_top: 0,
            scroll_bottom: height.saturating_sub(1),
            right_margin: width.saturating_sub(1),
            wrap_pending: false,
            insert_mode: false,
            vt52_mode: false,
            vt52_state: Vt52State::Ground,
            reverse_video: false,
            col_132: false,
            new_line_mode: false,
            arrow_key_mode: ArrowKeyMode::Ansi,
            application_keypad: false,
            s8c1t: false,
            tab_stops: default_tab_stops(width),
            cursor_visible: true,
            single_shift: None,
            current: SaveableState::default(),
            saved: None,
            answerback: String::new(),
            parser: VtParser::new(),
            pending_reply: Vec::new(),
        };
        e.display = (0..height).map(|_| DisplayLine::blank(false)).collect();
        e
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn display(&self) -> &[DisplayLine] {
        &self.display
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    pub fn scrollback_line(&self, index: usize) -> Option<&DisplayLine> {
        self.scrollback.get(index)
    }

    pub fn cursor(&self) -> (u16, u16) {
        (self.current.cursor_x, self.current.cursor_y)
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn set_answerback(&mut self, s: impl Into<String>) {
        self.answerback = s.into();
    }

    /// Drain and return any reply bytes produced by the last `consume` call
    /// (device attribute reports, status reports, answerback).
    pub fn take_reply(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.pending_reply)
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        let old_height = self.display.len();
        if height as usize > old_height {
            for _ in old_height..height as usize {
                self.display.push(DisplayLine::blank(self.reverse_video));
            }
        } else {
            self.display.truncate(height as usize);
        }
        self.width = width;
        self.height = height;
        self.scroll_top = 0;
        self.scroll_bottom = height.saturating_sub(1);
        self.right_margin = if self.current.origin_mode || self.display_half_width() {
            width / 2 - 1
        } else {
            width.saturating_sub(1)
        };
        self.current.cursor_x = self.current.cursor_x.min(width.saturating_sub(1));
        self.current.cursor_y = self.current.cursor_y.min(height.saturating_sub(1));
        self.tab_stops = default_tab_stops(width);
    }

    fn display_half_width(&self) -> bool {
        self.display
            .get(self.current.cursor_y as usize)
            .map(|l| l.double_width)
            .unwrap_or(false)
    }

    /// Feed one raw byte of the child process's output through the parser
    /// (or, in VT52 mode, through the direct-addressing sub-parser) and
    /// apply any resulting mutation.
    pub fn consume(&mut self, byte: u8) {
        let byte = if matches!(self.device, DeviceType::Vt100 | DeviceType::Vt102) {
            byte & 0x7f
        } else {
            byte
        };
        if self.vt52_state != Vt52State::Ground {
            if self.consume_vt52(byte) {
                return;
            }
        }
        let events = self.parser.advance(byte);
        for ev in events {
            self.dispatch(ev);
        }
    }

    pub fn consume_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.consume(b);
        }
    }

    fn consume_vt52(&mut self, byte: u8) -> bool {
        match self.vt52_state {
            Vt52State::Ground => false,
            Vt52State::ExpectCursorRow => {
                self.vt52_state = Vt52State::ExpectCursorCol(byte.saturating_sub(0x20) as u16);
                true
            }
            Vt52State::ExpectCursorCol(row) => {
                let col = byte.saturating_sub(0x20) as u16;
                self.vt52_state = Vt52State::Ground;
                self.current.cursor_y = row.min(self.height.saturating_sub(1));
                self.current.cursor_x = col.min(self.width.saturating_sub(1));
                self.wrap_pending = false;
                true
            }
        }
    }

    fn dispatch(&mut self, ev: ParserEvent) {
        match ev {
            ParserEvent::Print(ch) => self.print_char(ch),
            ParserEvent::Execute(byte) => self.execute(byte),
            ParserEvent::CsiDispatch {
                params,
                intermediates,
                ignore,
                action,
            } => self.csi_dispatch(&params, &intermediates, ignore, action),
            ParserEvent::EscDispatch {
                intermediates,
                ignore,
                byte,
            } => self.esc_dispatch(&intermediates, ignore, byte),
            ParserEvent::OscDispatch { .. } => {
                // window title / color palette OSCs: accepted and discarded,
                // this toolkit has no chrome to reflect them into.
            }
            ParserEvent::Hook { .. } | ParserEvent::Put(_) | ParserEvent::Unhook => {}
        }
    }

    // ---- printing -------------------------------------------------------

    fn active_charset(&self) -> CharacterSet {
        let slot = self.single_shift.unwrap_or(self.current.gl);
        self.current.g[slot_index(slot)]
    }

    fn print_char(&mut self, raw: char) {
        let ch = if (raw as u32) < 0x80 {
            charset::translate(raw, self.active_charset())
        } else {
            raw
        };
        self.single_shift = None;

        if self.wrap_pending {
            self.wrap_pending = false;
            if self.current.cursor_y == self.scroll_bottom {
                self.new_line_scroll();
            } else {
                self.current.cursor_y = (self.current.cursor_y + 1).min(self.height - 1);
            }
            self.current.cursor_x = 0;
        }

        let (x, y) = (self.current.cursor_x, self.current.cursor_y);
        if self.insert_mode {
            self.shift_row_right(y, x);
        }
        self.put_cell(x, y, ch);

        if x >= self.right_margin {
            self.wrap_pending = true;
        } else {
            self.current.cursor_x = x + 1;
        }
    }

    fn put_cell(&mut self, x: u16, y: u16, ch: char) {
        if let Some(line) = self.display.get_mut(y as usize) {
            line.set_cell(x as usize, vtk_common::Cell::new(ch, self.current.attrs));
        }
    }

    fn shift_row_right(&mut self, y: u16, from_x: u16) {
        if let Some(line) = self.display.get_mut(y as usize) {
            for x in (from_x + 1..=self.right_margin).rev() {
                let prev = line.cell((x - 1) as usize);
                line.set_cell(x as usize, prev);
            }
            line.set_cell(from_x as usize, vtk_common::Cell::blank());
        }
    }

    // ---- control codes ----------------------------------------------------

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => trace!("bell"),
            0x08 => self.cursor_left(1, false),
            0x09 => self.tab(),
            0x0A | 0x0B | 0x0C => self.new_line(),
            0x0D => {
                self.current.cursor_x = 0;
                self.wrap_pending = false;
            }
            0x05 => {
                let reply = self.answerback.clone().into_bytes();
                self.pending_reply.extend(reply);
            }
            0x0E => self.current.gl = GraphicsSlot::G1,
            0x0F => self.current.gl = GraphicsSlot::G0,
            _ => debug!("unhandled control byte 0x{:02x}", byte),
        }
    }

    fn new_line(&mut self) {
        if self.current.cursor_y == self.scroll_bottom {
            self.new_line_scroll();
        } else {
            self.current.cursor_y = (self.current.cursor_y + 1).min(self.height - 1);
        }
        if self.new_line_mode {
            self.current.cursor_x = 0;
        }
        self.wrap_pending = false;
    }

    fn new_line_scroll(&mut self) {
        if self.scroll_top == 0 && self.scroll_bottom == self.height.saturating_sub(1) {
            let old = self.display.remove(0);
            if self.scrollback.len() >= self.scrollback_max {
                self.scrollback.pop_front();
            }
            self.scrollback.push_back(old);
            self.display.push(DisplayLine::blank(self.reverse_video));
        } else {
            self.scroll_region_up(1);
        }
    }

    fn scroll_region_up(&mut self, n: u16) {
        let top = self.scroll_top as usize;
        let bottom = self.scroll_bottom as usize;
        for _ in 0..n {
            if top > bottom || bottom >= self.display.len() {
                break;
            }
            self.display.remove(top);
            self.display
                .insert(bottom, DisplayLine::blank(self.reverse_video));
        }
    }

    fn scroll_region_down(&mut self, n: u16) {
        let top = self.scroll_top as usize;
        let bottom = self.scroll_bottom as usize;
        for _ in 0..n {
            if top > bottom || bottom >= self.display.len() {
                break;
            }
            self.display.remove(bottom);
            self.display
                .insert(top, DisplayLine::blank(self.reverse_video));
        }
    }

    fn tab(&mut self) {
        let next = self
            .tab_stops
            .iter()
            .find(|&&s| s > self.current.cursor_x)
            .copied()
            .unwrap_or(self.right_margin);
        self.current.cursor_x = next.min(self.right_margin);
        self.wrap_pending = false;
    }

    fn set_tab_stop(&mut self) {
        if !self.tab_stops.contains(&self.current.cursor_x) {
            self.tab_stops.push(self.current.cursor_x);
            self.tab_stops.sort_unstable();
        }
    }

    fn clear_tab_stop(&mut self) {
        self.tab_stops.retain(|&s| s != self.current.cursor_x);
    }

    fn clear_all_tab_stops(&mut self) {
        self.tab_stops.clear();
    }

    // ---- cursor motion ------------------------------------------------

    fn cursor_up(&mut self, n: u16, honor_region: bool) {
        let floor = if honor_region { self.scroll_top } else { 0 };
        self.current.cursor_y = self.current.cursor_y.saturating_sub(n).max(floor);
        self.wrap_pending = false;
    }

    fn cursor_down(&mut self, n: u16, honor_region: bool) {
        let ceil = if honor_region {
            self.scroll_bottom
        } else {
            self.height.saturating_sub(1)
        };
        self.current.cursor_y = (self.current.cursor_y + n).min(ceil);
        self.wrap_pending = false;
    }

    fn cursor_left(&mut self, n: u16, _honor_region: bool) {
        self.current.cursor_x = self.current.cursor_x.saturating_sub(n);
        self.wrap_pending = false;
    }

    fn cursor_right(&mut self, n: u16, _honor_region: bool) {
        self.current.cursor_x = (self.current.cursor_x + n).min(self.right_margin);
        self.wrap_pending = false;
    }

    fn cursor_position(&mut self, row: u16, col: u16) {
        let base_row = if self.current.origin_mode { self.scroll_top } else { 0 };
        let max_row = if self.current.origin_mode {
            self.scroll_bottom
        } else {
            self.height.saturating_sub(1)
        };
        self.current.cursor_y = (base_row + row).min(max_row);
        self.current.cursor_x = col.min(self.right_margin);
        self.wrap_pending = false;
    }

    // ---- erase / insert / delete ----------------------------------------

    fn erase_display(&mut self, mode: u16) {
        let (cx, cy) = (self.current.cursor_x, self.current.cursor_y);
        match mode {
            0 => {
                self.erase_line_range(cy, cx, self.width);
                for y in cy + 1..self.height {
                    self.erase_line_range(y, 0, self.width);
                }
            }
            1 => {
                for y in 0..cy {
                    self.erase_line_range(y, 0, self.width);
                }
                self.erase_line_range(cy, 0, cx + 1);
            }
            2 => {
                for y in 0..self.height {
                    self.erase_line_range(y, 0, self.width);
                }
            }
            3 => {
                self.scrollback.clear();
                for y in 0..self.height {
                    self.erase_line_range(y, 0, self.width);
                }
            }
            _ => warn!("unhandled ED mode {mode}"),
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let (cx, cy) = (self.current.cursor_x, self.current.cursor_y);
        match mode {
            0 => self.erase_line_range(cy, cx, self.width),
            1 => self.erase_line_range(cy, 0, cx + 1),
            2 => self.erase_line_range(cy, 0, self.width),
            _ => warn!("unhandled EL mode {mode}"),
        }
    }

    fn erase_line_range(&mut self, y: u16, from: u16, to: u16) {
        if let Some(line) = self.display.get_mut(y as usize) {
            for x in from..to.min(self.width) {
                line.set_cell(x as usize, vtk_common::Cell::blank());
            }
        }
    }

    fn erase_chars(&mut self, n: u16) {
        let (cx, cy) = (self.current.cursor_x, self.current.cursor_y);
        self.erase_line_range(cy, cx, cx + n.max(1));
    }

    fn insert_lines(&mut self, n: u16) {
        let y = self.current.cursor_y;
        if y < self.scroll_top || y > self.scroll_bottom {
            return;
        }
        let saved_top = self.scroll_top;
        self.scroll_top = y;
        self.scroll_region_down(n);
        self.scroll_top = saved_top;
    }

    fn delete_lines(&mut self, n: u16) {
        let y = self.current.cursor_y;
        if y < self.scroll_top || y > self.scroll_bottom {
            return;
        }
        let saved_top = self.scroll_top;
        self.scroll_top = y;
        self.scroll_region_up(n);
        self.scroll_top = saved_top;
    }

    fn delete_chars(&mut self, n: u16) {
        let (cx, cy) = (self.current.cursor_x, self.current.cursor_y);
        if let Some(line) = self.display.get_mut(cy as usize) {
            let width = self.width as usize;
            for x in cx as usize..width {
                let src = x + n as usize;
                let cell = if src < width {
                    line.cell(src)
                } else {
                    vtk_common::Cell::blank()
                };
                line.set_cell(x, cell);
            }
        }
    }

    fn insert_chars(&mut self, n: u16) {
        let (cx, cy) = (self.current.cursor_x, self.current.cursor_y);
        for _ in 0..n {
            self.shift_row_right(cy, cx);
        }
    }

    // ---- SGR ------------------------------------------------------------

    fn apply_sgr(&mut self, params: &[Vec<u16>]) {
        if params.is_empty() {
            self.current.attrs = CellAttributes::default();
            return;
        }
        let mut i = 0;
        while i < params.len() {
            let p = params[i].first().copied().unwrap_or(0);
            match p {
                0 => self.current.attrs = CellAttributes::default(),
                1 => self.current.attrs.bold = true,
                5 => self.current.attrs.blink = true,
                7 => std::mem::swap(&mut self.current.attrs.fg, &mut self.current.attrs.bg),
                21 | 22 => self.current.attrs.bold = false,
                25 => self.current.attrs.blink = false,
                30..=37 => self.current.attrs.fg = Color::from_index((p - 30) as u8),
                38 => {
                    if let Some(color) = self.parse_extended_color(params, &mut i) {
                        self.current.attrs.fg = color;
                    }
                }
                39 => self.current.attrs.fg = Color::White,
                40..=47 => self.current.attrs.bg = Color::from_index((p - 40) as u8),
                48 => {
                    if let Some(color) = self.parse_extended_color(params, &mut i) {
                        self.current.attrs.bg = color;
                    }
                }
                49 => self.current.attrs.bg = Color::Black,
                90..=97 => self.current.attrs.fg = Color::from_index((p - 90) as u8),
                100..=107 => self.current.attrs.bg = Color::from_index((p - 100) as u8),
                _ => trace!("unhandled SGR parameter {p}"),
            }
            i += 1;
        }
    }

    /// `38;5;n` or `38;2;r;g;b`, mapped into the 8-color table since this
    /// toolkit has no true indexed/RGB palette.
    fn parse_extended_color(&self, params: &[Vec<u16>], i: &mut usize) -> Option<Color> {
        let kind = params.get(*i + 1)?.first().copied()?;
        match kind {
            5 => {
                let idx = params.get(*i + 2)?.first().copied()?;
                *i += 2;
                Some(Color::from_index((idx % 8) as u8))
            }
            2 => {
                let r = params.get(*i + 2)?.first().copied()? as u32;
                let g = params.get(*i + 3)?.first().copied()? as u32;
                let b = params.get(*i + 4)?.first().copied()? as u32;
                *i += 4;
                Some(nearest_indexed(r, g, b))
            }
            _ => None,
        }
    }

    // ---- CSI dispatch -----------------------------------------------------

    fn csi_dispatch(&mut self, params: &[Vec<u16>], intermediates: &[u8], ignore: bool, action: char) {
        if ignore {
            return;
        }
        let private = intermediates.first() == Some(&b'?');
        let n = |idx: usize, default: u16| -> u16 {
            params
                .get(idx)
                .and_then(|g| g.first().copied())
                .filter(|&v| v > 0)
                .unwrap_or(default)
        };

        match action {
            'A' => self.cursor_up(n(0, 1), true),
            'B' | 'e' => self.cursor_down(n(0, 1), true),
            'C' | 'a' => self.cursor_right(n(0, 1), false),
            'D' => self.cursor_left(n(0, 1), false),
            'E' => {
                self.current.cursor_x = 0;
                self.cursor_down(n(0, 1), true);
            }
            'F' => {
                self.current.cursor_x = 0;
                self.cursor_up(n(0, 1), true);
            }
            'G' | '`' => {
                self.current.cursor_x = n(0, 1).saturating_sub(1).min(self.right_margin);
                self.wrap_pending = false;
            }
            'H' | 'f' => self.cursor_position(n(0, 1).saturating_sub(1), n(1, 1).saturating_sub(1)),
            'd' => {
                let row = n(0, 1).saturating_sub(1);
                self.cursor_position(row, self.current.cursor_x);
            }
            'J' => self.erase_display(n(0, 0)),
            'K' => self.erase_line(n(0, 0)),
            'L' => self.insert_lines(n(0, 1)),
            'M' => self.delete_lines(n(0, 1)),
            'P' => self.delete_chars(n(0, 1)),
            '@' => self.insert_chars(n(0, 1)),
            'X' => self.erase_chars(n(0, 1)),
            'S' => self.scroll_region_up(n(0, 1)),
            'T' => self.scroll_region_down(n(0, 1)),
            'g' => match n(0, 0) {
                0 => self.clear_tab_stop(),
                3 => self.clear_all_tab_stops(),
                _ => {}
            },
            'm' => self.apply_sgr(params),
            'r' => {
                let top = n(0, 1).saturating_sub(1);
                let bottom = if params.len() > 1 {
                    n(1, self.height)
                } else {
                    self.height
                }
                .saturating_sub(1);
                self.set_scroll_region(top, bottom);
            }
            'n' => self.device_status_report(n(0, 0)),
            'c' if !private => self.report_device_attributes(),
            'h' | 'l' => self.set_modes(params, private, action == 'h'),
            _ => trace!("unhandled CSI {action} params={params:?}"),
        }
    }

    fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        if top >= bottom || bottom >= self.height {
            self.scroll_top = 0;
            self.scroll_bottom = self.height.saturating_sub(1);
        } else {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        }
        self.current.cursor_x = 0;
        self.current.cursor_y = if self.current.origin_mode { self.scroll_top } else { 0 };
        self.wrap_pending = false;
    }

    fn set_modes(&mut self, params: &[Vec<u16>], private: bool, enable: bool) {
        for group in params {
            let Some(&mode) = group.first() else { continue };
            if private {
                match mode {
                    1 => self.arrow_key_mode = if enable { ArrowKeyMode::Application } else { ArrowKeyMode::Ansi },
                    2 => self.vt52_mode = !enable,
                    6 => self.current.origin_mode = enable,
                    7 => { /* auto-wrap: tracked implicitly via right margin logic */ }
                    25 => self.cursor_visible = enable,
                    3 => self.col_132 = enable,
                    45 => {}
                    1049 | 47 | 1047 => { /* alt screen: no secondary buffer kept, accepted no-op */ }
                    1000 | 1002 | 1003 | 1005 | 1006 => { /* mouse modes: negotiated at the TermIO layer */ }
                    _ => trace!("unhandled DEC private mode {mode}"),
                }
            } else {
                match mode {
                    4 => self.insert_mode = enable,
                    20 => self.new_line_mode = enable,
                    _ => trace!("unhandled ANSI mode {mode}"),
                }
            }
        }
    }

    fn device_status_report(&mut self, kind: u16) {
        match kind {
            5 => self.pending_reply.extend_from_slice(b"\x1b[0n"),
            6 => {
                let row = if self.current.origin_mode {
                    self.current.cursor_y - self.scroll_top
                } else {
                    self.current.cursor_y
                } + 1;
                let col = self.current.cursor_x + 1;
                self.pending_reply
                    .extend_from_slice(format!("\x1b[{row};{col}R").as_bytes());
            }
            _ => {}
        }
    }

    fn report_device_attributes(&mut self) {
        let reply: &[u8] = match self.device {
            DeviceType::Vt100 | DeviceType::XTerm => b"\x1b[?1;2c",
            DeviceType::Vt102 => b"\x1b[?6c",
            DeviceType::Vt220 => {
                if self.s8c1t {
                    b"\x9b?62;1;6c"
                } else {
                    b"\x1b[?62;1;6c"
                }
            }
        };
        self.pending_reply.extend_from_slice(reply);
    }

    // ---- ESC dispatch -----------------------------------------------------

    fn esc_dispatch(&mut self, intermediates: &[u8], ignore: bool, byte: u8) {
        if ignore {
            return;
        }
        match (intermediates, byte) {
            (b"", b'D') => self.new_line_no_cr(),
            (b"", b'E') => {
                self.current.cursor_x = 0;
                self.new_line_no_cr();
            }
            (b"", b'H') => self.set_tab_stop(),
            (b"", b'M') => {
                if self.current.cursor_y == self.scroll_top {
                    self.scroll_region_down(1);
                } else {
                    self.cursor_up(1, false);
                }
            }
            (b"", b'7') => self.save_cursor(),
            (b"", b'8') => self.restore_cursor(),
            (b"", b'c') => self.full_reset(),
            (b"", b'=') => self.application_keypad = true,
            (b"", b'>') => self.application_keypad = false,
            (b"", b'Z') => self.report_device_attributes(),
            (b"", b'N') => self.single_shift = Some(GraphicsSlot::G2),
            (b"", b'O') => self.single_shift = Some(GraphicsSlot::G3),
            (b"", b'Y') if self.vt52_mode => self.vt52_state = Vt52State::ExpectCursorRow,
            (b"", b'<') => self.vt52_mode = false,
            (b" ", b'F') => self.s8c1t = false,
            (b" ", b'G') => self.s8c1t = true,
            (b"(", set) => self.designate_charset(GraphicsSlot::G0, set),
            (b")", set) => self.designate_charset(GraphicsSlot::G1, set),
            (b"*", set) => self.designate_charset(GraphicsSlot::G2, set),
            (b"+", set) => self.designate_charset(GraphicsSlot::G3, set),
            _ => trace!("unhandled ESC {intermediates:?} 0x{byte:02x}"),
        }
    }

    fn new_line_no_cr(&mut self) {
        if self.current.cursor_y == self.scroll_bottom {
            self.new_line_scroll();
        } else {
            self.current.cursor_y = (self.current.cursor_y + 1).min(self.height - 1);
        }
        self.wrap_pending = false;
    }

    fn designate_charset(&mut self, slot: GraphicsSlot, designator: u8) {
        let set = match designator {
            b'A' => CharacterSet::Uk,
            b'B' => CharacterSet::UsAscii,
            b'0' => CharacterSet::DecSpecialGraphics,
            b'1' => CharacterSet::Rom,
            b'2' => CharacterSet::RomSpecial,
            b'<' => CharacterSet::DecSupplemental,
            b'4' => CharacterSet::Nrc(NrcSet::Dutch),
            b'5' => CharacterSet::Nrc(NrcSet::Finnish),
            b'R' => CharacterSet::Nrc(NrcSet::French),
            b'Q' => CharacterSet::Nrc(NrcSet::FrenchCanadian),
            b'K' => CharacterSet::Nrc(NrcSet::German),
            b'Y' => CharacterSet::Nrc(NrcSet::Italian),
            b'7' => CharacterSet::Nrc(NrcSet::SwedishNorwegian),
            b'Z' => CharacterSet::Nrc(NrcSet::Spanish),
            b'=' => CharacterSet::Nrc(NrcSet::Swiss),
            _ => return,
        };
        self.current.g[slot_index(slot)] = set;
    }

    fn save_cursor(&mut self) {
        self.saved = Some(self.current.clone());
    }

    fn restore_cursor(&mut self) {
        if let Some(s) = self.saved.clone() {
            self.current = s;
        }
    }

    fn full_reset(&mut self) {
        let device = self.device;
        let (w, h) = (self.width, self.height);
        *self = Ecma48::new(w, h, device);
    }

    // ---- key translation --------------------------------------------------

    /// Encode a keypress into the byte string this device would send to the
    /// child process.
    pub fn keypress(&self, key: &TKeypress) -> Vec<u8> {
        let ctrl = key.modifiers.contains(Modifier::CTRL);
        let alt = key.modifiers.contains(Modifier::ALT);
        let shift = key.modifiers.contains(Modifier::SHIFT);

        let mut bytes = match key.key {
            Key::Char(c) => {
                if ctrl && c.is_ascii_alphabetic() {
                    vec![(c.to_ascii_uppercase() as u8) - 0x40]
                } else {
                    let mut buf = [0u8; 4];
                    c.encode_utf8(&mut buf).as_bytes().to_vec()
                }
            }
            Key::Code(KeyCode::Backspace) => vec![0x7f],
            Key::Code(KeyCode::Tab) => vec![b'\t'],
            Key::Code(KeyCode::BackTab) => b"\x1b[Z".to_vec(),
            Key::Code(KeyCode::Enter) => vec![b'\r'],
            Key::Code(KeyCode::Escape) => vec![0x1b],
            Key::Code(KeyCode::Up) => self.arrow_sequence(b'A', key.modifiers),
            Key::Code(KeyCode::Down) => self.arrow_sequence(b'B', key.modifiers),
            Key::Code(KeyCode::Right) => self.arrow_sequence(b'C', key.modifiers),
            Key::Code(KeyCode::Left) => self.arrow_sequence(b'D', key.modifiers),
            Key::Code(KeyCode::Home) => self.arrow_sequence(b'H', key.modifiers),
            Key::Code(KeyCode::End) => self.arrow_sequence(b'F', key.modifiers),
            Key::Code(KeyCode::PageUp) => tilde_sequence(5, key.modifiers),
            Key::Code(KeyCode::PageDown) => tilde_sequence(6, key.modifiers),
            Key::Code(KeyCode::Insert) => tilde_sequence(2, key.modifiers),
            Key::Code(KeyCode::Delete) => tilde_sequence(3, key.modifiers),
            Key::Code(KeyCode::F(n)) => self.function_key_sequence(n, key.modifiers),
        };

        if alt && matches!(key.key, Key::Char(_)) {
            bytes.insert(0, 0x1b);
        }
        let _ = shift;
        bytes
    }

    fn arrow_sequence(&self, letter: u8, modifiers: Modifier) -> Vec<u8> {
        if self.arrow_key_mode == ArrowKeyMode::Application && modifiers.is_empty() {
            return vec![0x1b, b'O', letter];
        }
        match xterm_modifier_code(modifiers) {
            None => vec![0x1b, b'[', letter],
            Some(code) => {
                let mut v = format!("\x1b[1;{code}").into_bytes();
                v.push(letter);
                v
            }
        }
    }

    /// Each F-key x modifier combination gets its own distinct byte
    /// sequence - no two keys are compared against the same value.
    fn function_key_sequence(&self, n: u8, modifiers: Modifier) -> Vec<u8> {
        let code = xterm_modifier_code(modifiers);
        match n {
            1..=4 => {
                let letter = [b'P', b'Q', b'R', b'S'][(n - 1) as usize];
                match code {
                    None => vec![0x1b, b'O', letter],
                    Some(code) => {
                        let mut v = format!("\x1b[1;{code}").into_bytes();
                        v.push(letter);
                        v
                    }
                }
            }
            5 => tilde_sequence(15, modifiers),
            6 => tilde_sequence(17, modifiers),
            7 => tilde_sequence(18, modifiers),
            8 => tilde_sequence(19, modifiers),
            9 => tilde_sequence(20, modifiers),
            10 => tilde_sequence(21, modifiers),
            11 => tilde_sequence(23, modifiers),
            12 => tilde_sequence(24, modifiers),
            _ => Vec::new(),
        }
    }
}

/// xterm's `CSI n ; m ~` / `CSI 1 ; m <letter>` modifier parameter: `m - 1`
/// is a shift=1/alt=2/ctrl=4 bitmask. `None` means "plain key, omit the
/// modifier field entirely" (the form every terminal already understands).
fn xterm_modifier_code(modifiers: Modifier) -> Option<u16> {
    if modifiers.is_empty() {
        return None;
    }
    let mut bits = 0u16;
    if modifiers.contains(Modifier::SHIFT) {
        bits |= 1;
    }
    if modifiers.contains(Modifier::ALT) {
        bits |= 2;
    }
    if modifiers.contains(Modifier::CTRL) {
        bits |= 4;
    }
    Some(bits + 1)
}

fn tilde_sequence(n: u16, modifiers: Modifier) -> Vec<u8> {
    match xterm_modifier_code(modifiers) {
        None => format!("\x1b[{n}~").into_bytes(),
        Some(code) => format!("\x1b[{n};{code}~").into_bytes(),
    }
}

fn slot_index(slot: GraphicsSlot) -> usize {
    match slot {
        GraphicsSlot::G0 => 0,
        GraphicsSlot::G1 => 1,
        GraphicsSlot::G2 => 2,
        GraphicsSlot::G3 => 3,
    }
}

fn default_tab_stops(width: u16) -> Vec<u16> {
    (0..width).step_by(8).collect()
}

fn nearest_indexed(r: u32, g: u32, b: u32) -> Color {
    let bit = |v: u32| v >= 128;
    match (bit(r), bit(g), bit(b)) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_hello_places_text_at_origin() {
        let mut e = Ecma48::new(80, 24, DeviceType::Vt102);
        e.consume_bytes(b"hello");
        let line = &e.display()[0];
        let text: String = line.cells()[..5].iter().map(|c| c.ch).collect();
        assert_eq!(text, "hello");
        assert_eq!(e.cursor(), (5, 0));
    }

    #[test]
    fn wrap_at_right_margin_then_advances() {
        let mut e = Ecma48::new(4, 2, DeviceType::Vt102);
        e.consume_bytes(b"ABCD");
        assert_eq!(e.cursor(), (3, 0));
        e.consume_bytes(b"E");
        assert_eq!(e.cursor(), (1, 1));
        assert_eq!(e.display()[1].cell(0).ch, 'E');
    }

    #[test]
    fn sgr_sets_fg_bold() {
        let mut e = Ecma48::new(10, 2, DeviceType::Vt102);
        e.consume_bytes(b"\x1b[31;1mX");
        let cell = e.display()[0].cell(0);
        assert_eq!(cell.attrs.fg, Color::Red);
        assert!(cell.attrs.bold);
    }

    #[test]
    fn ed_full_clear_then_home() {
        let mut e = Ecma48::new(10, 2, DeviceType::Vt102);
        e.consume_bytes(b"hello");
        e.consume_bytes(b"\x1b[2J\x1b[HZ");
        assert_eq!(e.cursor(), (1, 0));
        assert_eq!(e.display()[0].cell(0).ch, 'Z');
    }

    #[test]
    fn save_restore_cursor_round_trip() {
        let mut e = Ecma48::new(20, 10, DeviceType::Vt102);
        e.consume_bytes(b"\x1b[5;5H");
        // designate G1 as DEC special graphics and shift GL to it
        e.consume_bytes(b"\x1b)0\x0e");
        assert_eq!(e.current.gl, GraphicsSlot::G1);
        assert_eq!(e.current.g[1], CharacterSet::DecSpecialGraphics);
        e.consume_bytes(b"\x1b7");
        // move, shift back to G0, redesignate G1 - all of this should be undone by restore
        e.consume_bytes(b"\x1b[1;1H");
        e.consume_bytes(b"\x0f\x1b)B");
        assert_eq!(e.current.gl, GraphicsSlot::G0);
        assert_eq!(e.current.g[1], CharacterSet::UsAscii);
        e.consume_bytes(b"\x1b8");
        assert_eq!(e.cursor(), (4, 4));
        assert_eq!(e.current.gl, GraphicsSlot::G1);
        assert_eq!(e.current.g[1], CharacterSet::DecSpecialGraphics);
    }

    #[test]
    fn origin_mode_home_goes_to_region_top() {
        let mut e = Ecma48::new(20, 10, DeviceType::Vt102);
        e.consume_bytes(b"\x1b[3;7r");
        e.consume_bytes(b"\x1b[?6h");
        e.consume_bytes(b"\x1b[H");
        assert_eq!(e.cursor().1, 2);
    }

    #[test]
    fn device_attributes_query_replies() {
        let mut e = Ecma48::new(20, 10, DeviceType::Vt102);
        e.consume_bytes(b"\x1b[c");
        assert_eq!(e.take_reply(), b"\x1b[?6c".to_vec());
    }

    #[test]
    fn parser_never_panics_on_arbitrary_input() {
        let mut e = Ecma48::new(20, 10, DeviceType::Vt102);
        let data: Vec<u8> = (0u8..=255).collect();
        e.consume_bytes(&data);
    }

    proptest::proptest! {
        #[test]
        fn consume_never_panics_on_random_byte_streams(data: Vec<u8>) {
            let mut e = Ecma48::new(40, 12, DeviceType::XTerm);
            e.consume_bytes(&data);
        }
    }

    #[test]
    fn function_keys_have_distinct_sequences() {
        let e = Ecma48::new(20, 10, DeviceType::Vt102);
        let f1 = e.keypress(&TKeypress::plain(Key::Code(KeyCode::F(1))));
        let f2 = e.keypress(&TKeypress::plain(Key::Code(KeyCode::F(2))));
        assert_ne!(f1, f2);
    }
}
