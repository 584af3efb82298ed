//! A thin `vte::Perform` wrapper that turns a raw ECMA-48 byte stream into a
//! small vocabulary of parser events. This crate knows nothing about cursors,
//! screens or cell attributes - that interpretation lives in `vtk-core`'s
//! emulator; this crate only runs the canonical ANSI/VT state machine and
//! reports what it saw.

use tracing::trace;
use vte::{Params, Parser, Perform};

/// One parsed unit of the control stream.
#[derive(Debug, Clone)]
pub enum ParserEvent {
    /// A single printable character, already translated from the input
    /// encoding but not yet through any G0-G3 charset mapping.
    Print(char),
    /// A C0/C1 control code (BEL, BS, HT, LF, CR, ...).
    Execute(u8),
    /// `CSI params intermediates action`, e.g. `CSI 1 ; 2 H`.
    CsiDispatch {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        ignore: bool,
        action: char,
    },
    /// `ESC intermediates byte`, e.g. `ESC 7`.
    EscDispatch {
        intermediates: Vec<u8>,
        ignore: bool,
        byte: u8,
    },
    /// `OSC params ST|BEL`.
    OscDispatch { params: Vec<Vec<u8>>, bell_terminated: bool },
    /// DCS open.
    Hook {
        params: Vec<Vec<u16>>,
        intermediates: Vec<u8>,
        ignore: bool,
        action: char,
    },
    /// DCS data byte.
    Put(u8),
    /// DCS close.
    Unhook,
}

pub struct VtParser {
    parser: Parser,
    performer: Collector,
}

impl VtParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            performer: Collector::default(),
        }
    }

    /// Feed a single byte through the state machine, returning any events
    /// it produced. Most bytes produce zero or one event; CSI/OSC/DCS
    /// terminators can never produce more than one.
    pub fn advance(&mut self, byte: u8) -> Vec<ParserEvent> {
        self.parser.advance(&mut self.performer, byte);
        std::mem::take(&mut self.performer.events)
    }

    /// Feed a whole buffer, returning all events produced in order.
    pub fn advance_all(&mut self, data: &[u8]) -> Vec<ParserEvent> {
        for &byte in data {
            self.parser.advance(&mut self.performer, byte);
        }
        std::mem::take(&mut self.performer.events)
    }
}

impl Default for VtParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Collector {
    events: Vec<ParserEvent>,
}

fn params_to_vec(params: &Params) -> Vec<Vec<u16>> {
    params.iter().map(|group| group.to_vec()).collect()
}

impl Perform for Collector {
    fn print(&mut self, c: char) {
        self.events.push(ParserEvent::Print(c));
    }

    fn execute(&mut self, byte: u8) {
        trace!("execute 0x{:02x}", byte);
        self.events.push(ParserEvent::Execute(byte));
    }

    fn hook(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.events.push(ParserEvent::Hook {
            params: params_to_vec(params),
            intermediates: intermediates.to_vec(),
            ignore,
            action,
        });
    }

    fn put(&mut self, byte: u8) {
        self.events.push(ParserEvent::Put(byte));
    }

    fn unhook(&mut self) {
        self.events.push(ParserEvent::Unhook);
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], bell_terminated: bool) {
        self.events.push(ParserEvent::OscDispatch {
            params: params.iter().map(|p| p.to_vec()).collect(),
            bell_terminated,
        });
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.events.push(ParserEvent::CsiDispatch {
            params: params_to_vec(params),
            intermediates: intermediates.to_vec(),
            ignore,
            action,
        });
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], ignore: bool, byte: u8) {
        self.events.push(ParserEvent::EscDispatch {
            intermediates: intermediates.to_vec(),
            ignore,
            byte,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_prints_each_char() {
        let mut p = VtParser::new();
        let events = p.advance_all(b"Hi!");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ParserEvent::Print('H')));
        assert!(matches!(events[2], ParserEvent::Print('!')));
    }

    #[test]
    fn csi_cursor_position_dispatches_with_params() {
        let mut p = VtParser::new();
        let events = p.advance_all(b"\x1b[10;20H");
        assert_eq!(events.len(), 1);
        match &events[0] {
            ParserEvent::CsiDispatch { params, action, .. } => {
                assert_eq!(*action, 'H');
                assert_eq!(params[0][0], 10);
                assert_eq!(params[1][0], 20);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn execute_then_print_preserve_order() {
        let mut p = VtParser::new();
        let events = p.advance_all(b"a\nb");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ParserEvent::Print('a')));
        assert!(matches!(events[1], ParserEvent::Execute(0x0A)));
        assert!(matches!(events[2], ParserEvent::Print('b')));
    }

    #[test]
    fn never_panics_on_arbitrary_bytes() {
        let mut p = VtParser::new();
        let mut data = Vec::new();
        for b in 0u8..=255 {
            data.push(b);
        }
        let _ = p.advance_all(&data);
    }
}
