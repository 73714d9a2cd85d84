use std::time::Duration;

use crossterm::{
    event, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::recorder::FeedReceiver;
use crate::tui::draw::draw_console;
use crate::tui::events::{handle_feed, handle_ui, ui_event_from, Flow};
use crate::tui::state::{feed_height, ConsoleState, UiEvent};

/// Restores the terminal however the console loop ends, including when the
/// future is dropped by a fatal error elsewhere.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

/// Own the screen until the operator quits. The loop only ever waits on its
/// two channels; all I/O happens in the reader thread and the recorder.
pub async fn run_console(mut state: ConsoleState, mut feed: FeedReceiver) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let guard = TerminalGuard;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let size = terminal.size()?;
    state.scrollback.resize(feed_height(size.height));

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel::<UiEvent>();

    // Keyboard and resize reader
    tokio::task::spawn_blocking(move || loop {
        if ui_tx.is_closed() {
            break;
        }
        if event::poll(Duration::from_millis(50)).unwrap_or(false) {
            if let Some(ev) = event::read().ok().and_then(ui_event_from) {
                if ui_tx.send(ev).is_err() {
                    break;
                }
            }
        }
    });

    terminal.draw(|f| draw_console(f, &state))?;
    loop {
        tokio::select! {
            Some(ev) = ui_rx.recv() => {
                if handle_ui(&mut state, ev) == Flow::Quit {
                    info!("operator quit");
                    break;
                }
            }
            Some(line) = feed.recv() => handle_feed(&mut state, line),
            else => {
                debug!("console inputs closed");
                break;
            }
        }
        terminal.draw(|f| draw_console(f, &state))?;
    }

    drop(terminal);
    drop(guard);
    Ok(())
}
