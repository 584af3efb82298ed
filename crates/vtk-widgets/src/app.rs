//! The single-threaded cooperative main loop: one tick reads whatever
//! controlling-terminal input is available, dispatches it, lets every widget
//! do its own non-blocking idle work (a hosted shell pumps its pipe here),
//! and flushes the screen if anything changed. There is no event bus and no
//! spawned task; everything happens inline, tick after tick.

use std::io;
use std::time::Duration;

use tracing::debug;
use vtk_common::{MouseButton, Rect, TInputEvent, VtkError};
use vtk_core::{InputDecoder, RawModeGuard, Screen};

use crate::arena::{Arena, WidgetId};
use crate::theme::Theme;
use crate::widget::Widget;

/// How long a tick sleeps when there was nothing to read, so the loop never
/// spins a core even though it never blocks on the controlling terminal.
const IDLE_TICK: Duration = Duration::from_millis(15);

pub struct Application {
    pub widgets: Arena<Widget>,
    pub screen: Screen,
    pub theme: Theme,
    pub focus: Option<WidgetId>,
    pub z_order: Vec<WidgetId>,
    decoder: InputDecoder,
    _raw_mode: RawModeGuard,
    running: bool,
}

impl Application {
    pub fn new() -> Result<Self, VtkError> {
        let (cols, rows) = vtk_core::termio::query_size();
        let raw_mode = RawModeGuard::acquire()?;
        set_stdin_nonblocking();
        Ok(Self {
            widgets: Arena::new(),
            screen: Screen::new(cols, rows),
            theme: Theme::default(),
            focus: None,
            z_order: Vec::new(),
            decoder: InputDecoder::new(),
            _raw_mode: raw_mode,
            running: true,
        })
    }

    pub fn insert(&mut self, widget: Widget) -> WidgetId {
        let id = self.widgets.insert(widget);
        self.z_order.push(id);
        if self.focus.is_none() {
            if let Some(w) = self.widgets.get(id) {
                if w.focusable {
                    self.focus = Some(id);
                }
            }
        }
        id
    }

    pub fn bring_to_front(&mut self, id: WidgetId) {
        self.z_order.retain(|&w| w != id);
        self.z_order.push(id);
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one tick: drain pending input, dispatch it, idle every widget,
    /// flush if the screen is dirty. Returns once there is nothing more to
    /// read this tick, sleeping briefly first if nothing was read at all.
    pub fn tick(&mut self) -> io::Result<()> {
        let mut read_any = false;
        let mut stdin = io::stdin();
        while let Some(ch) = vtk_core::termio::read_utf8_char(&mut stdin)? {
            read_any = true;
            for event in self.decoder.feed(ch) {
                self.dispatch(event);
            }
        }
        if let Some(event) = self.decoder.poll_timeout() {
            self.dispatch(event);
        }

        for id in self.z_order.clone() {
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.on_idle();
            }
        }

        self.draw()?;

        if !read_any {
            std::thread::sleep(IDLE_TICK);
        }
        Ok(())
    }

    fn dispatch(&mut self, event: TInputEvent) {
        match event {
            TInputEvent::Keypress(key) => {
                let is_quit = key.key == vtk_common::Key::Code(vtk_common::KeyCode::F(10));
                if is_quit {
                    self.quit();
                    return;
                }
                if let Some(id) = self.focus {
                    if let Some(widget) = self.widgets.get_mut(id) {
                        if widget.on_key(&key) {
                            return;
                        }
                    }
                }
                self.cycle_focus(key.key == vtk_common::Key::Code(vtk_common::KeyCode::BackTab));
            }
            TInputEvent::MouseDown { button, x, y, .. } => self.route_mouse_down(button, x, y),
            TInputEvent::MouseUp { button, x, y, .. } => self.route_mouse_up(button, x, y),
            TInputEvent::MouseMotion { button, x, y, .. } => self.route_mouse_motion(button, x, y),
        }
    }

    fn cycle_focus(&mut self, backward: bool) {
        let focusable: Vec<WidgetId> = self
            .z_order
            .iter()
            .copied()
            .filter(|&id| self.widgets.get(id).map(|w| w.focusable).unwrap_or(false))
            .collect();
        if focusable.is_empty() {
            return;
        }
        let current = self.focus.and_then(|id| focusable.iter().position(|&w| w == id));
        let next = match current {
            Some(i) if backward => (i + focusable.len() - 1) % focusable.len(),
            Some(i) => (i + 1) % focusable.len(),
            None => 0,
        };
        self.focus = Some(focusable[next]);
    }

    fn route_mouse_down(&mut self, button: MouseButton, x: u16, y: u16) {
        for id in self.z_order.clone().into_iter().rev() {
            if let Some(widget) = self.widgets.get_mut(id) {
                if widget.visible && widget.on_mouse_down(button, x, y) {
                    if widget.focusable {
                        self.focus = Some(id);
                    }
                    self.bring_to_front(id);
                    return;
                }
            }
        }
    }

    fn route_mouse_up(&mut self, button: MouseButton, x: u16, y: u16) {
        for id in self.z_order.clone().into_iter().rev() {
            if let Some(widget) = self.widgets.get_mut(id) {
                if widget.visible && widget.on_mouse_up(button, x, y) {
                    return;
                }
            }
        }
    }

    fn route_mouse_motion(&mut self, button: Option<MouseButton>, x: u16, y: u16) {
        for id in self.z_order.clone().into_iter().rev() {
            if let Some(widget) = self.widgets.get_mut(id) {
                if widget.visible && widget.on_mouse_motion(button, x, y) {
                    return;
                }
            }
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        for id in self.z_order.clone() {
            if let Some(widget) = self.widgets.get(id) {
                let focused = self.focus == Some(id);
                widget.draw(&mut self.screen, &self.theme, focused);
            }
        }
        if self.screen.is_dirty() {
            let bytes = self.screen.flush();
            if !bytes.is_empty() {
                use std::io::Write;
                let mut out = io::stdout();
                out.write_all(&bytes)?;
                out.flush()?;
            }
        }
        Ok(())
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.screen.resize(cols, rows);
        debug!("resized to {cols}x{rows}");
        if let Some(&desktop) = self.z_order.first() {
            if let Some(widget) = self.widgets.get_mut(desktop) {
                widget.on_resize(Rect::new(0, 0, cols, rows));
            }
        }
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        for id in self.z_order.clone() {
            if let Some(widget) = self.widgets.get_mut(id) {
                widget.on_close();
            }
        }
    }
}

fn set_stdin_nonblocking() {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = io::stdin().as_raw_fd();
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL, 0);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        }
    }
}
