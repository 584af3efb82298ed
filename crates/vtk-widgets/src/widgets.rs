//! Concrete widget state. Each struct owns only the data specific to that
//! widget; the uniform `draw`/`on_key`/`on_mouse_*` interface lives on the
//! `Widget` wrapper in `widget.rs`, dispatched through `WidgetKind`.

use vtk_common::{CellAttributes, Key, KeyCode, Rect, TKeypress};
use vtk_core::{BorderStyle, Ecma48, Screen, TerminalWidget};

use crate::arena::WidgetId;
use crate::theme::Theme;

pub struct ButtonState {
    pub label: String,
    pub pressed: bool,
    pub on_click: Option<Box<dyn FnMut()>>,
}

impl ButtonState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pressed: false,
            on_click: None,
        }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, focused: bool, theme: &Theme) {
        let attrs = if focused { theme.selected } else { theme.normal };
        let text = format!("[ {} ]", self.label);
        screen.put_str(rect.x, rect.y, &text, attrs);
    }

    pub fn activate(&mut self) {
        self.pressed = true;
        if let Some(cb) = self.on_click.as_mut() {
            cb();
        }
    }
}

pub struct LabelState {
    pub text: String,
}

impl LabelState {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        screen.put_str(rect.x, rect.y, &self.text, theme.normal);
    }
}

pub struct InputLineState {
    pub text: String,
    pub cursor: usize,
    pub max_len: usize,
}

impl InputLineState {
    pub fn new(max_len: usize) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            max_len,
        }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, focused: bool, theme: &Theme) {
        let attrs = if focused { theme.selected } else { theme.normal };
        let visible: String = self.text.chars().take(rect.w as usize).collect();
        screen.put_str(rect.x, rect.y, &visible, attrs);
        for i in visible.chars().count() as u16..rect.w {
            screen.put_char(rect.x + i, rect.y, ' ', attrs);
        }
    }

    pub fn on_key(&mut self, key: &TKeypress) -> bool {
        match key.key {
            Key::Char(c) if self.text.chars().count() < self.max_len => {
                self.text.insert(self.byte_index(), c);
                self.cursor += 1;
                true
            }
            Key::Code(KeyCode::Backspace) if self.cursor > 0 => {
                self.cursor -= 1;
                let idx = self.byte_index();
                self.text.remove(idx);
                true
            }
            Key::Code(KeyCode::Left) if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Key::Code(KeyCode::Right) if self.cursor < self.text.chars().count() => {
                self.cursor += 1;
                true
            }
            _ => false,
        }
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

pub struct CheckBoxState {
    pub label: String,
    pub checked: bool,
}

impl CheckBoxState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            checked: false,
        }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, focused: bool, theme: &Theme) {
        let attrs = if focused { theme.selected } else { theme.normal };
        let mark = if self.checked { 'X' } else { ' ' };
        let text = format!("[{}] {}", mark, self.label);
        screen.put_str(rect.x, rect.y, &text, attrs);
    }

    pub fn toggle(&mut self) {
        self.checked = !self.checked;
    }
}

pub struct RadioGroupState {
    pub labels: Vec<String>,
    pub selected: usize,
}

impl RadioGroupState {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels, selected: 0 }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, focus_index: Option<usize>, theme: &Theme) {
        for (i, label) in self.labels.iter().enumerate() {
            let y = rect.y + i as u16;
            if y >= rect.y + rect.h {
                break;
            }
            let mark = if i == self.selected { '*' } else { ' ' };
            let attrs = if focus_index == Some(i) { theme.selected } else { theme.normal };
            let text = format!("({}) {}", mark, label);
            screen.put_str(rect.x, y, &text, attrs);
        }
    }

    pub fn select(&mut self, index: usize) {
        if index < self.labels.len() {
            self.selected = index;
        }
    }
}

pub struct ProgressBarState {
    pub value: u8,
}

impl ProgressBarState {
    pub fn new() -> Self {
        Self { value: 0 }
    }

    pub fn set_value(&mut self, v: u8) {
        self.value = v.min(100);
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        let filled = ((rect.w as u32 * self.value as u32) / 100) as u16;
        for i in 0..rect.w {
            let ch = if i < filled { '\u{2588}' } else { '\u{2591}' };
            screen.put_char(rect.x + i, rect.y, ch, theme.normal);
        }
    }
}

impl Default for ProgressBarState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
    pub expanded: bool,
}

impl TreeNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
            expanded: false,
        }
    }
}

pub struct TreeViewState {
    pub roots: Vec<TreeNode>,
    pub selected: usize,
    pub scroll: usize,
}

impl TreeViewState {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self {
            roots,
            selected: 0,
            scroll: 0,
        }
    }

    fn flatten(&self) -> Vec<(usize, &str)> {
        fn walk<'a>(nodes: &'a [TreeNode], depth: usize, out: &mut Vec<(usize, &'a str)>) {
            for n in nodes {
                out.push((depth, n.label.as_str()));
                if n.expanded {
                    walk(&n.children, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, 0, &mut out);
        out
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, focused: bool, theme: &Theme) {
        let rows = self.flatten();
        for (row, (depth, label)) in rows.iter().enumerate().skip(self.scroll).take(rect.h as usize) {
            let y = rect.y + (row - self.scroll) as u16;
            let attrs = if focused && row == self.selected { theme.selected } else { theme.normal };
            let indent = "  ".repeat(*depth);
            let text = format!("{indent}{label}");
            screen.put_str(rect.x, y, &text, attrs);
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.flatten().len();
        if len == 0 {
            return;
        }
        let next = (self.selected as i32 + delta).clamp(0, len as i32 - 1);
        self.selected = next as usize;
    }
}

pub struct TextViewState {
    pub lines: Vec<String>,
    pub scroll: usize,
}

impl TextViewState {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, scroll: 0 }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        for (row, line) in self.lines.iter().enumerate().skip(self.scroll).take(rect.h as usize) {
            let y = rect.y + (row - self.scroll) as u16;
            screen.put_str(rect.x, y, line, theme.normal);
        }
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let max = self.lines.len().saturating_sub(1);
        self.scroll = (self.scroll as i32 + delta).clamp(0, max as i32) as usize;
    }
}

pub struct EditorState {
    pub lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub scroll: usize,
}

impl EditorState {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_row: 0,
            cursor_col: 0,
            scroll: 0,
        }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        for (row, line) in self.lines.iter().enumerate().skip(self.scroll).take(rect.h as usize) {
            let y = rect.y + (row - self.scroll) as u16;
            screen.put_str(rect.x, y, line, theme.normal);
        }
    }

    pub fn on_key(&mut self, key: &TKeypress) {
        match key.key {
            Key::Char(c) => {
                let line = &mut self.lines[self.cursor_row];
                let idx = byte_index(line, self.cursor_col);
                line.insert(idx, c);
                self.cursor_col += 1;
            }
            Key::Code(KeyCode::Enter) => {
                let line = self.lines[self.cursor_row].clone();
                let idx = byte_index(&line, self.cursor_col);
                let (head, tail) = line.split_at(idx);
                self.lines[self.cursor_row] = head.to_string();
                self.lines.insert(self.cursor_row + 1, tail.to_string());
                self.cursor_row += 1;
                self.cursor_col = 0;
            }
            Key::Code(KeyCode::Backspace) => {
                if self.cursor_col > 0 {
                    self.cursor_col -= 1;
                    let idx = byte_index(&self.lines[self.cursor_row], self.cursor_col);
                    self.lines[self.cursor_row].remove(idx);
                } else if self.cursor_row > 0 {
                    let cur = self.lines.remove(self.cursor_row);
                    self.cursor_row -= 1;
                    self.cursor_col = self.lines[self.cursor_row].chars().count();
                    self.lines[self.cursor_row].push_str(&cur);
                }
            }
            Key::Code(KeyCode::Up) if self.cursor_row > 0 => {
                self.cursor_row -= 1;
                self.clamp_col();
            }
            Key::Code(KeyCode::Down) if self.cursor_row + 1 < self.lines.len() => {
                self.cursor_row += 1;
                self.clamp_col();
            }
            Key::Code(KeyCode::Left) if self.cursor_col > 0 => self.cursor_col -= 1,
            Key::Code(KeyCode::Right) => {
                let len = self.lines[self.cursor_row].chars().count();
                if self.cursor_col < len {
                    self.cursor_col += 1;
                }
            }
            _ => {}
        }
    }

    fn clamp_col(&mut self) {
        let len = self.lines[self.cursor_row].chars().count();
        self.cursor_col = self.cursor_col.min(len);
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

fn byte_index(s: &str, col: usize) -> usize {
    s.char_indices().nth(col).map(|(i, _)| i).unwrap_or(s.len())
}

pub struct TerminalHostState {
    pub widget: TerminalWidget,
}

impl TerminalHostState {
    pub fn new(cols: u16, rows: u16, shell: Option<&str>) -> vtk_common::Result<Self> {
        Ok(Self {
            widget: TerminalWidget::spawn(cols, rows, shell)?,
        })
    }

    pub fn emulator(&self) -> &Ecma48 {
        self.widget.emulator()
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect) {
        let emu = self.widget.emulator();
        for (row, line) in emu.display().iter().enumerate().take(rect.h as usize) {
            let y = rect.y + row as u16;
            for (col, cell) in line.cells().iter().enumerate().take(rect.w as usize) {
                let x = rect.x + col as u16;
                screen.put_char(x, y, cell.ch, cell.attrs);
            }
        }
    }

    pub fn on_key(&mut self, key: &TKeypress) {
        self.widget.send_key(key);
    }

    pub fn on_idle(&mut self) {
        self.widget.on_idle();
    }

    pub fn on_resize(&mut self, cols: u16, rows: u16) {
        self.widget.resize(cols, rows);
    }
}

pub struct MenuEntry {
    pub label: String,
    pub target: Option<WidgetId>,
}

pub struct MenuBarState {
    pub entries: Vec<MenuEntry>,
    pub active: Option<usize>,
}

impl MenuBarState {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self { entries, active: None }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        let mut x = rect.x;
        for (i, entry) in self.entries.iter().enumerate() {
            let attrs = if self.active == Some(i) { theme.menu_selected } else { theme.menu };
            let text = format!(" {} ", entry.label);
            screen.put_str(x, rect.y, &text, attrs);
            x += text.chars().count() as u16;
        }
        for x2 in x..rect.x + rect.w {
            screen.put_char(x2, rect.y, ' ', theme.menu);
        }
    }
}

pub struct StatusLineState {
    pub text: String,
}

impl StatusLineState {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        let attrs = theme.menu;
        screen.put_str(rect.x, rect.y, &self.text, attrs);
        let used = self.text.chars().count() as u16;
        for x in rect.x + used..rect.x + rect.w {
            screen.put_char(x, rect.y, ' ', attrs);
        }
    }
}

pub struct WindowState {
    pub title: String,
    pub modal: bool,
    pub children: Vec<WidgetId>,
}

impl WindowState {
    pub fn new(title: impl Into<String>, modal: bool) -> Self {
        Self {
            title: title.into(),
            modal,
            children: Vec::new(),
        }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect, theme: &Theme) {
        let style = if self.modal { BorderStyle::Double } else { BorderStyle::Single };
        screen.draw_box(rect, theme.frame, style, Some(theme.normal), !self.modal);
        let title = format!(" {} ", self.title);
        let x = rect.x + (rect.w.saturating_sub(title.chars().count() as u16)) / 2;
        screen.put_str(x, rect.y, &title, theme.frame);
    }
}

pub struct DesktopState {
    pub windows: Vec<WidgetId>,
}

impl DesktopState {
    pub fn new() -> Self {
        Self { windows: Vec::new() }
    }

    pub fn draw(&self, screen: &mut Screen, rect: Rect) {
        let attrs = CellAttributes {
            fg: vtk_common::Color::Cyan,
            bg: vtk_common::Color::Blue,
            bold: false,
            blink: false,
        };
        for y in rect.y..rect.y + rect.h {
            screen.hline(rect.x, y, rect.w, '\u{2591}', attrs);
        }
    }
}

impl Default for DesktopState {
    fn default() -> Self {
        Self::new()
    }
}
