pub mod app;
pub mod arena;
pub mod theme;
pub mod widget;
pub mod widgets;

pub use app::Application;
pub use arena::{Arena, WidgetId};
pub use theme::Theme;
pub use widget::{Widget, WidgetKind};
pub use widgets::{
    ButtonState, CheckBoxState, DesktopState, EditorState, InputLineState, LabelState,
    MenuBarState, MenuEntry, ProgressBarState, RadioGroupState, StatusLineState,
    TerminalHostState, TextViewState, TreeNode, TreeViewState, WindowState,
};
