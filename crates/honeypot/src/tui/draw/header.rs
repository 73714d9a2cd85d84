use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::tui::state::ConsoleState;

use super::ThemeColors;

pub fn draw_status(f: &mut ratatui::Frame<'_>, area: Rect, state: &ConsoleState, theme: &ThemeColors) {
    let time = chrono::Local::now().format("%H:%M:%S");
    let geo = if state.geo_enabled { "geo on" } else { "geo off" };

    let mut spans = vec![
        Span::styled(" ssh-honeypot", Style::default().fg(theme.primary).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(" │ {} │ :{} │ ", state.host, state.port),
            Style::default().fg(theme.muted),
        ),
        Span::styled(
            format!("{} attempts", state.total),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" │ {} sources │ {} │ {} ", state.sources.len(), geo, time),
            Style::default().fg(theme.muted),
        ),
    ];
    if state.malformed > 0 {
        spans.push(Span::styled(
            format!("│ {} malformed ", state.malformed),
            Style::default().fg(theme.error),
        ));
    }

    // No background; some terminals render unknown colors as bright red.
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
