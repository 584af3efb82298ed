use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vtk_common::Rect;
use vtk_widgets::{
    Application, DesktopState, MenuBarState, MenuEntry, StatusLineState, TerminalHostState,
    Widget, WidgetKind, WindowState,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vtk text-mode desktop demo", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Terminal rows (defaults to current terminal size)
    #[arg(long)]
    rows: Option<u16>,

    /// Terminal columns (defaults to current terminal size)
    #[arg(long)]
    cols: Option<u16>,

    /// Override shell to use (e.g., /bin/sh, /bin/bash)
    #[arg(long)]
    shell: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "vtk=debug" } else { "vtk=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("starting vtk demo desktop");

    let mut app = Application::new()?;
    let (cols, rows) = (app.screen.width(), app.screen.height());
    let cols = args.cols.unwrap_or(cols);
    let rows = args.rows.unwrap_or(rows);
    if cols == 0 || rows == 0 {
        anyhow::bail!("terminal must have non-zero size, got {cols}x{rows}");
    }
    app.screen.resize(cols, rows);

    app.insert(Widget::new(
        Rect::new(0, 0, cols, rows),
        WidgetKind::Desktop(DesktopState::new()),
    ));

    app.insert(Widget::new(
        Rect::new(0, 0, cols, 1),
        WidgetKind::MenuBar(MenuBarState::new(vec![
            MenuEntry { label: "File".into(), target: None },
            MenuEntry { label: "Window".into(), target: None },
            MenuEntry { label: "Help".into(), target: None },
        ])),
    ));

    app.insert(Widget::new(
        Rect::new(0, rows.saturating_sub(1), cols, 1),
        WidgetKind::StatusLine(StatusLineState::new(" F10 Quit   Tab focus next widget ")),
    ));

    let win_rect = Rect::new(2, 2, cols.saturating_sub(4), rows.saturating_sub(5));
    app.insert(Widget::new(win_rect, WidgetKind::Window(WindowState::new("Shell", false))));

    let term_rect = Rect::new(win_rect.x + 1, win_rect.y + 1, win_rect.w.saturating_sub(2), win_rect.h.saturating_sub(2));
    let terminal = TerminalHostState::new(term_rect.w, term_rect.h, args.shell.as_deref())?;
    app.insert(Widget::new(term_rect, WidgetKind::Terminal(terminal)));

    while app.is_running() {
        app.tick()?;
    }

    info!("vtk demo exiting");
    Ok(())
}
