//! Raw-mode acquisition for the controlling terminal, plus the hand-rolled
//! keyboard/mouse input decoder. This grammar (xterm function-key CSI
//! sequences, UTF-8 mouse reports) is deliberately not run through the
//! ECMA-48 state machine in `vtk_parser` - that machine describes what a
//! terminal emits, not what a terminal receives from the user, and the two
//! grammars diverge enough (mouse packets especially) that sharing one
//! parser would just complicate both.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crossterm::terminal;
use tracing::{debug, warn};
use vtk_common::{Key, KeyCode, Modifier, MouseButton, TInputEvent, TKeypress, VtkError};

const BARE_ESC_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    Mouse,
}

/// Decodes a stream of code points into `TInputEvent`s, tracking the 250ms
/// bare-ESC timeout and the xterm UTF-8 mouse (1005) sub-grammar.
pub struct InputDecoder {
    state: DecoderState,
    esc_at: Option<Instant>,
    params: Vec<u16>,
    current_param: Option<u16>,
    mouse_bytes: Vec<u16>,
    tracked_button: Option<MouseButton>,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Ground,
            esc_at: None,
            params: Vec::new(),
            current_param: None,
            mouse_bytes: Vec::new(),
            tracked_button: None,
        }
    }

    /// Feed one decoded code point, returning any events it completed.
    pub fn feed(&mut self, ch: char) -> Vec<TInputEvent> {
        let mut out = Vec::new();
        match self.state {
            DecoderState::Ground => self.feed_ground(ch, &mut out),
            DecoderState::Escape => self.feed_escape(ch, &mut out),
            DecoderState::EscapeIntermediate => self.feed_escape_intermediate(ch, &mut out),
            DecoderState::CsiEntry | DecoderState::CsiParam => self.feed_csi(ch, &mut out),
            DecoderState::Mouse => self.feed_mouse(ch, &mut out),
        }
        out
    }

    /// Called periodically by the main loop; if a bare ESC has been
    /// pending longer than the timeout, synthesize it now.
    pub fn poll_timeout(&mut self) -> Option<TInputEvent> {
        if self.state == DecoderState::Escape {
            if let Some(at) = self.esc_at {
                if at.elapsed() >= BARE_ESC_TIMEOUT {
                    self.state = DecoderState::Ground;
                    self.esc_at = None;
                    return Some(TInputEvent::Keypress(TKeypress::plain(Key::Code(KeyCode::Escape))));
                }
            }
        }
        None
    }

    fn feed_ground(&mut self, ch: char, out: &mut Vec<TInputEvent>) {
        match ch {
            '\x1b' => {
                self.state = DecoderState::Escape;
                self.esc_at = Some(Instant::now());
            }
            '\r' => out.push(key_event(Key::Code(KeyCode::Enter), Modifier::empty())),
            '\t' => out.push(key_event(Key::Code(KeyCode::Tab), Modifier::empty())),
            '\x7f' | '\x08' => out.push(key_event(Key::Code(KeyCode::Backspace), Modifier::empty())),
            c if (c as u32) < 0x20 => {
                let letter = ((c as u8) + 0x40) as char;
                out.push(key_event(Key::Char(letter.to_ascii_lowercase()), Modifier::CTRL));
            }
            c => out.push(key_event(Key::Char(c), Modifier::empty())),
        }
    }

    fn feed_escape(&mut self, ch: char, out: &mut Vec<TInputEvent>) {
        self.esc_at = None;
        match ch {
            'O' => self.state = DecoderState::EscapeIntermediate,
            '[' => {
                self.state = DecoderState::CsiEntry;
                self.params.clear();
                self.current_param = None;
            }
            c if (c as u32) < 0x20 => {
                self.state = DecoderState::Ground;
                let letter = ((c as u8) + 0x40) as char;
                out.push(key_event(Key::Char(letter.to_ascii_lowercase()), Modifier::ALT));
            }
            c => {
                self.state = DecoderState::Ground;
                out.push(key_event(Key::Char(c), Modifier::ALT));
            }
        }
    }

    fn feed_escape_intermediate(&mut self, ch: char, out: &mut Vec<TInputEvent>) {
        self.state = DecoderState::Ground;
        match ch {
            'P' => out.push(key_event(Key::Code(KeyCode::F(1)), Modifier::empty())),
            'Q' => out.push(key_event(Key::Code(KeyCode::F(2)), Modifier::empty())),
            'R' => out.push(key_event(Key::Code(KeyCode::F(3)), Modifier::empty())),
            'S' => out.push(key_event(Key::Code(KeyCode::F(4)), Modifier::empty())),
            _ => debug!("unhandled SS3 letter {ch:?}"),
        }
    }

    fn feed_csi(&mut self, ch: char, out: &mut Vec<TInputEvent>) {
        match ch {
            '0'..='9' => {
                self.state = DecoderState::CsiParam;
                let digit = ch as u16 - '0' as u16;
                self.current_param = Some(self.current_param.unwrap_or(0) * 10 + digit);
            }
            ';' => {
                self.params.push(self.current_param.take().unwrap_or(0));
            }
            'M' => {
                self.state = DecoderState::Mouse;
                self.mouse_bytes.clear();
            }
            '~' => {
                if let Some(p) = self.current_param.take() {
                    self.params.push(p);
                }
                self.state = DecoderState::Ground;
                self.dispatch_tilde(out);
            }
            'A' | 'B' | 'C' | 'D' | 'H' | 'F' | 'Z' => {
                self.state = DecoderState::Ground;
                let modifiers = self.modifier_from_second_param();
                let key = match ch {
                    'A' => Key::Code(KeyCode::Up),
                    'B' => Key::Code(KeyCode::Down),
                    'C' => Key::Code(KeyCode::Right),
                    'D' => Key::Code(KeyCode::Left),
                    'H' => Key::Code(KeyCode::Home),
                    'F' => Key::Code(KeyCode::End),
                    _ => Key::Code(KeyCode::BackTab),
                };
                out.push(key_event(key, modifiers));
            }
            _ => {
                warn!("unhandled CSI final byte {ch:?}");
                self.state = DecoderState::Ground;
            }
        }
    }

    fn dispatch_tilde(&mut self, out: &mut Vec<TInputEvent>) {
        let first = self.params.first().copied().unwrap_or(0);
        let modifiers = self
            .params
            .get(1)
            .map(|&m| modifier_from_xterm_param(m))
            .unwrap_or_else(Modifier::empty);
        let key = match first {
            1 => Key::Code(KeyCode::Home),
            2 => Key::Code(KeyCode::Insert),
            3 => Key::Code(KeyCode::Delete),
            4 => Key::Code(KeyCode::End),
            5 => Key::Code(KeyCode::PageUp),
            6 => Key::Code(KeyCode::PageDown),
            15 => Key::Code(KeyCode::F(5)),
            17 => Key::Code(KeyCode::F(6)),
            18 => Key::Code(KeyCode::F(7)),
            19 => Key::Code(KeyCode::F(8)),
            20 => Key::Code(KeyCode::F(9)),
            21 => Key::Code(KeyCode::F(10)),
            23 => Key::Code(KeyCode::F(11)),
            24 => Key::Code(KeyCode::F(12)),
            _ => {
                self.params.clear();
                return;
            }
        };
        self.params.clear();
        out.push(key_event(key, modifiers));
    }

    fn modifier_from_second_param(&mut self) -> Modifier {
        let m = if let Some(p) = self.current_param.take() {
            modifier_from_xterm_param(p)
        } else {
            self.params
                .get(1)
                .map(|&p| modifier_from_xterm_param(p))
                .unwrap_or_else(Modifier::empty)
        };
        self.params.clear();
        m
    }

    fn feed_mouse(&mut self, ch: char, out: &mut Vec<TInputEvent>) {
        self.mouse_bytes.push(ch as u16);
        if self.mouse_bytes.len() < 3 {
            return;
        }
        self.state = DecoderState::Ground;
        let button_byte = self.mouse_bytes[0].wrapping_sub(32);
        let x = self.mouse_bytes[1].wrapping_sub(33);
        let y = self.mouse_bytes[2].wrapping_sub(33);
        self.mouse_bytes.clear();

        match button_byte {
            0 | 1 | 2 => {
                let button = match button_byte {
                    0 => MouseButton::Left,
                    1 => MouseButton::Middle,
                    _ => MouseButton::Right,
                };
                self.tracked_button = Some(button);
                out.push(TInputEvent::MouseDown {
                    button,
                    x,
                    y,
                    abs_x: x,
                    abs_y: y,
                });
            }
            3 => {
                if let Some(button) = self.tracked_button.take() {
                    out.push(TInputEvent::MouseUp {
                        button,
                        x,
                        y,
                        abs_x: x,
                        abs_y: y,
                    });
                } else {
                    out.push(TInputEvent::MouseMotion { button: None, x, y, abs_x: x, abs_y: y });
                }
            }
            32 | 33 | 34 => {
                let button = match button_byte - 32 {
                    0 => MouseButton::Left,
                    1 => MouseButton::Middle,
                    _ => MouseButton::Right,
                };
                out.push(TInputEvent::MouseMotion {
                    button: Some(button),
                    x,
                    y,
                    abs_x: x,
                    abs_y: y,
                });
            }
            64 => out.push(TInputEvent::MouseDown {
                button: MouseButton::WheelUp,
                x,
                y,
                abs_x: x,
                abs_y: y,
            }),
            65 => out.push(TInputEvent::MouseDown {
                button: MouseButton::WheelDown,
                x,
                y,
                abs_x: x,
                abs_y: y,
            }),
            _ => out.push(TInputEvent::MouseMotion { button: None, x, y, abs_x: x, abs_y: y }),
        }
    }
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn key_event(key: Key, modifiers: Modifier) -> TInputEvent {
    TInputEvent::Keypress(TKeypress::new(key, modifiers))
}

fn modifier_from_xterm_param(p: u16) -> Modifier {
    // xterm encodes modifiers as (value - 1) bitmask: shift=1, alt=2, ctrl=4
    match p.saturating_sub(1) {
        0 => Modifier::empty(),
        bits => {
            let mut m = Modifier::empty();
            if bits & 1 != 0 {
                m |= Modifier::SHIFT;
            }
            if bits & 2 != 0 {
                m |= Modifier::ALT;
            }
            if bits & 4 != 0 {
                m |= Modifier::CTRL;
            }
            m
        }
    }
}

/// Scoped raw-mode guard: restores the terminal on drop, including on an
/// unwinding panic, so a crash never leaves the user's shell in raw mode.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn acquire() -> Result<Self, VtkError> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.write_all(mouse_enable_sequence())?;
        stdout.write_all(b"\x1b[?25l")?;
        stdout.flush()?;
        Ok(Self { active: true })
    }

    pub fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let mut stdout = io::stdout();
        let _ = stdout.write_all(mouse_disable_sequence());
        let _ = stdout.write_all(b"\x1b[?25h");
        let _ = stdout.flush();
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn mouse_enable_sequence() -> &'static [u8] {
    b"\x1b[?1003;1005h\x1b[?1036h\x1b[?1034l"
}

fn mouse_disable_sequence() -> &'static [u8] {
    b"\x1b[?1003;1005l"
}

pub fn query_size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Read a single UTF-8 code point from a reader, determining the
/// continuation-byte count from the lead byte.
pub fn read_utf8_char<R: Read>(r: &mut R) -> io::Result<Option<char>> {
    let mut lead = [0u8; 1];
    match r.read(&mut lead) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
        Err(e) => return Err(e),
    }
    let b0 = lead[0];
    let len = if b0 & 0x80 == 0 {
        1
    } else if b0 & 0xE0 == 0xC0 {
        2
    } else if b0 & 0xF0 == 0xE0 {
        3
    } else if b0 & 0xF8 == 0xF0 {
        4
    } else {
        1
    };
    let mut buf = vec![b0];
    for _ in 1..len {
        let mut byte = [0u8; 1];
        if r.read(&mut byte)? == 0 {
            break;
        }
        buf.push(byte[0]);
    }
    Ok(std::str::from_utf8(&buf).ok().and_then(|s| s.chars().next()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_up_decodes_to_single_keypress() {
        let mut d = InputDecoder::new();
        let mut events = Vec::new();
        for ch in "\x1b[A".chars() {
            events.extend(d.feed(ch));
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            TInputEvent::Keypress(TKeypress {
                key: Key::Code(KeyCode::Up),
                ..
            })
        ));
    }

    #[test]
    fn f5_with_ctrl_modifier() {
        let mut d = InputDecoder::new();
        let mut events = Vec::new();
        for ch in "\x1b[15;5~".chars() {
            events.extend(d.feed(ch));
        }
        assert_eq!(events.len(), 1);
        match events[0] {
            TInputEvent::Keypress(k) => {
                assert_eq!(k.key, Key::Code(KeyCode::F(5)));
                assert!(k.modifiers.contains(Modifier::CTRL));
            }
            _ => panic!("expected keypress"),
        }
    }

    #[test]
    fn mouse_down_packet_decodes_zero_based_coords() {
        let mut d = InputDecoder::new();
        let mut events = Vec::new();
        let packet = [
            '\x1b', '[', 'M', (0u8 + 32) as char, (10u8 + 33) as char, (20u8 + 33) as char,
        ];
        for ch in packet {
            events.extend(d.feed(ch));
        }
        assert_eq!(events.len(), 1);
        match events[0] {
            TInputEvent::MouseDown { x, y, button, .. } => {
                assert_eq!((x, y), (10, 20));
                assert_eq!(button, MouseButton::Left);
            }
            _ => panic!("expected mouse down"),
        }
    }

    #[test]
    fn bare_escape_times_out() {
        let mut d = InputDecoder::new();
        d.feed('\x1b');
        assert!(d.poll_timeout().is_none());
        std::thread::sleep(Duration::from_millis(260));
        let ev = d.poll_timeout();
        assert!(matches!(
            ev,
            Some(TInputEvent::Keypress(TKeypress {
                key: Key::Code(KeyCode::Escape),
                ..
            }))
        ));
    }
}
