//! The uniform widget interface: every concrete widget state sits inside a
//! `WidgetKind` variant, and `Widget` dispatches `draw`/`on_key`/`on_mouse_*`
//! to whichever one is present without the caller needing a match of its own.

use vtk_common::{MouseButton, Rect, TKeypress};
use vtk_core::Screen;

use crate::arena::WidgetId;
use crate::theme::Theme;
use crate::widgets::{
    ButtonState, CheckBoxState, DesktopState, EditorState, InputLineState, LabelState,
    MenuBarState, ProgressBarState, RadioGroupState, StatusLineState, TerminalHostState,
    TextViewState, TreeViewState, WindowState,
};

pub enum WidgetKind {
    Window(WindowState),
    Button(ButtonState),
    Label(LabelState),
    InputLine(InputLineState),
    CheckBox(CheckBoxState),
    RadioGroup(RadioGroupState),
    ProgressBar(ProgressBarState),
    TreeView(TreeViewState),
    TextView(TextViewState),
    Editor(EditorState),
    Terminal(TerminalHostState),
    MenuBar(MenuBarState),
    StatusLine(StatusLineState),
    Desktop(DesktopState),
}

pub struct Widget {
    pub rect: Rect,
    pub parent: Option<WidgetId>,
    pub visible: bool,
    pub focusable: bool,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(rect: Rect, kind: WidgetKind) -> Self {
        let focusable = matches!(
            kind,
            WidgetKind::Button(_)
                | WidgetKind::InputLine(_)
                | WidgetKind::CheckBox(_)
                | WidgetKind::RadioGroup(_)
                | WidgetKind::TreeView(_)
                | WidgetKind::Editor(_)
                | WidgetKind::Terminal(_)
        );
        Self {
            rect,
            parent: None,
            visible: true,
            focusable,
            kind,
        }
    }

    pub fn draw(&self, screen: &mut Screen, theme: &Theme, focused: bool) {
        if !self.visible {
            return;
        }
        match &self.kind {
            WidgetKind::Window(w) => w.draw(screen, self.rect, theme),
            WidgetKind::Button(b) => b.draw(screen, self.rect, focused, theme),
            WidgetKind::Label(l) => l.draw(screen, self.rect, theme),
            WidgetKind::InputLine(i) => i.draw(screen, self.rect, focused, theme),
            WidgetKind::CheckBox(c) => c.draw(screen, self.rect, focused, theme),
            WidgetKind::RadioGroup(r) => {
                r.draw(screen, self.rect, focused.then_some(r.selected), theme)
            }
            WidgetKind::ProgressBar(p) => p.draw(screen, self.rect, theme),
            WidgetKind::TreeView(t) => t.draw(screen, self.rect, focused, theme),
            WidgetKind::TextView(t) => t.draw(screen, self.rect, theme),
            WidgetKind::Editor(e) => e.draw(screen, self.rect, theme),
            WidgetKind::Terminal(t) => t.draw(screen, self.rect),
            WidgetKind::MenuBar(m) => m.draw(screen, self.rect, theme),
            WidgetKind::StatusLine(s) => s.draw(screen, self.rect, theme),
            WidgetKind::Desktop(d) => d.draw(screen, self.rect),
        }
    }

    /// Returns `true` if the key was consumed.
    pub fn on_key(&mut self, key: &TKeypress) -> bool {
        match &mut self.kind {
            WidgetKind::Button(b) => match key.key {
                vtk_common::Key::Code(vtk_common::KeyCode::Enter) => {
                    b.activate();
                    true
                }
                _ => false,
            },
            WidgetKind::InputLine(i) => i.on_key(key),
            WidgetKind::CheckBox(c) => match key.key {
                vtk_common::Key::Code(vtk_common::KeyCode::Enter)
                | vtk_common::Key::Char(' ') => {
                    c.toggle();
                    true
                }
                _ => false,
            },
            WidgetKind::RadioGroup(r) => match key.key {
                vtk_common::Key::Code(vtk_common::KeyCode::Up) if r.selected > 0 => {
                    r.select(r.selected - 1);
                    true
                }
                vtk_common::Key::Code(vtk_common::KeyCode::Down) => {
                    r.select(r.selected + 1);
                    true
                }
                _ => false,
            },
            WidgetKind::TreeView(t) => match key.key {
                vtk_common::Key::Code(vtk_common::KeyCode::Up) => {
                    t.move_selection(-1);
                    true
                }
                vtk_common::Key::Code(vtk_common::KeyCode::Down) => {
                    t.move_selection(1);
                    true
                }
                _ => false,
            },
            WidgetKind::TextView(t) => match key.key {
                vtk_common::Key::Code(vtk_common::KeyCode::Up) => {
                    t.scroll_by(-1);
                    true
                }
                vtk_common::Key::Code(vtk_common::KeyCode::Down) => {
                    t.scroll_by(1);
                    true
                }
                vtk_common::Key::Code(vtk_common::KeyCode::PageUp) => {
                    t.scroll_by(-(self.rect.h as i32));
                    true
                }
                vtk_common::Key::Code(vtk_common::KeyCode::PageDown) => {
                    t.scroll_by(self.rect.h as i32);
                    true
                }
                _ => false,
            },
            WidgetKind::Editor(e) => {
                e.on_key(key);
                true
            }
            WidgetKind::Terminal(t) => {
                t.on_key(key);
                true
            }
            _ => false,
        }
    }

    pub fn on_mouse_down(&mut self, button: MouseButton, x: u16, y: u16) -> bool {
        if !self.rect.contains(x, y) {
            return false;
        }
        if let WidgetKind::Button(b) = &mut self.kind {
            if button == MouseButton::Left {
                b.activate();
                return true;
            }
        }
        if let WidgetKind::CheckBox(c) = &mut self.kind {
            if button == MouseButton::Left {
                c.toggle();
                return true;
            }
        }
        true
    }

    pub fn on_mouse_up(&mut self, button: MouseButton, x: u16, y: u16) -> bool {
        if let WidgetKind::Button(b) = &mut self.kind {
            b.pressed = false;
        }
        let _ = button;
        self.rect.contains(x, y)
    }

    pub fn on_mouse_motion(&mut self, button: Option<MouseButton>, x: u16, y: u16) -> bool {
        let _ = button;
        self.rect.contains(x, y)
    }

    pub fn on_resize(&mut self, rect: Rect) {
        self.rect = rect;
        if let WidgetKind::Terminal(t) = &mut self.kind {
            t.on_resize(rect.w, rect.h);
        }
    }

    pub fn on_close(&mut self) {
        if let WidgetKind::Terminal(t) = &mut self.kind {
            t.widget.close();
        }
    }

    pub fn on_idle(&mut self) {
        if let WidgetKind::Terminal(t) = &mut self.kind {
            t.on_idle();
        }
    }
}
