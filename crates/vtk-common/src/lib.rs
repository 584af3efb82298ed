pub mod cell;
pub mod charset;
pub mod error;
pub mod geometry;
pub mod keys;

pub use cell::{Cell, CellAttributes, Color};
pub use charset::{CharacterSet, NrcSet};
pub use error::{Result, VtkError};
pub use geometry::{Position, Rect, Size};
pub use keys::{Key, KeyCode, Modifier, MouseButton, TInputEvent, TKeypress};
