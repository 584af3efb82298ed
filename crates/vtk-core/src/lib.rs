pub mod ecma48;
pub mod saveable;
pub mod screen;
pub mod termio;
pub mod termwidget;

pub use ecma48::{ArrowKeyMode, DeviceType, Ecma48};
pub use saveable::SaveableState;
pub use screen::{BorderStyle, DisplayLine, DoubleHeight, Screen};
pub use termio::{InputDecoder, RawModeGuard};
pub use termwidget::{ChildStatus, TerminalWidget};
