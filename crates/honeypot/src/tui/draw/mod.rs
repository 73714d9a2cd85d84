mod feed;
mod footer;
mod header;
pub mod theme;

use ratatui::layout::{Constraint, Direction, Layout};

pub use feed::draw_feed;
pub use footer::draw_footer;
pub use header::draw_status;
pub use theme::{get_theme, ThemeColors, ThemeKind};

use crate::tui::state::ConsoleState;

pub fn draw_console(f: &mut ratatui::Frame<'_>, state: &ConsoleState) {
    let area = f.size();
    let theme = get_theme(state.theme);
    // status line and footer take one row each; see `state::CHROME_ROWS`
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    draw_status(f, chunks[0], state, &theme);
    draw_feed(f, chunks[1], state, &theme);
    draw_footer(f, chunks[2], &theme);
}
