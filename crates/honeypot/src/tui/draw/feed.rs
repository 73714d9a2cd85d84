use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::tui::state::{column_header, ConsoleState, FeedLine};

use super::ThemeColors;

fn feed_line<'a>(line: &'a FeedLine, theme: &ThemeColors) -> Line<'a> {
    match line {
        FeedLine::Attempt(row) => Line::from(vec![
            Span::styled(row.timestamp.as_str(), Style::default().fg(theme.timestamp)),
            Span::raw(" "),
            Span::styled(row.user.as_str(), Style::default().fg(theme.user)),
            Span::raw(" "),
            Span::styled(row.password.as_str(), Style::default().fg(theme.password)),
            Span::raw(" "),
            Span::styled(row.source.as_str(), Style::default().fg(theme.source)),
            Span::raw(" "),
            Span::styled(row.place.as_str(), Style::default().fg(theme.source)),
        ]),
        FeedLine::Malformed { raw, error } => Line::from(vec![
            Span::styled(raw.as_str(), Style::default().fg(theme.muted)),
            Span::styled(format!(" error: {error}"), Style::default().fg(theme.error)),
        ]),
    }
}

pub fn draw_feed(f: &mut ratatui::Frame<'_>, area: Rect, state: &ConsoleState, theme: &ThemeColors) {
    let mut lines = Vec::with_capacity(state.scrollback.len() + 1);
    lines.push(Line::from(Span::styled(
        column_header(),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    lines.extend(state.scrollback.iter().map(|l| feed_line(l, theme)));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.primary))
        .title(state.title())
        .title_style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local};
    use common::{serialize_record, Attempt, Location};
    use ratatui::{backend::TestBackend, Terminal};

    use crate::tui::draw::{draw_console, ThemeKind};
    use crate::tui::events::handle_feed;
    use crate::tui::state::ConsoleState;

    fn render(state: &ConsoleState, width: u16, height: u16) -> Vec<String> {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_console(f, state)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                let mut row = String::new();
                for x in 0..width {
                    row.push_str(buffer.get(x, y).symbol());
                }
                row.trim_end().to_string()
            })
            .collect()
    }

    fn published(user: &str) -> String {
        serialize_record(&Attempt {
            timestamp: DateTime::parse_from_rfc3339("2024-05-06T07:08:09+02:00").unwrap(),
            username: user.into(),
            password: "123456".into(),
            source_address: "203.0.113.5".into(),
            location: Location::unknown(),
        })
        .unwrap()
    }

    #[test]
    fn header_survives_eviction() {
        let height = 10;
        let mut state = ConsoleState::new(ThemeKind::Dark, Local::now(), "decoy".into(), 2222, true, height);
        for i in 0..12 {
            handle_feed(&mut state, published(&format!("user{i:02}")));
        }
        let screen = render(&state, 140, height);

        // status, top border, column header, 5 attempts, bottom border, footer
        assert!(screen[0].contains("12 attempts"));
        assert!(screen[1].contains("SSH Honeypot - Started:"));
        assert!(screen[2].contains("Date"));
        assert!(screen[2].contains("IP Address and Location"));
        assert!(screen[3].contains("user07"));
        assert!(screen[7].contains("user11"));
        assert!(screen[7].contains("(Unknown City, Unknown Region, Unknown Country)"));
        assert!(screen.iter().all(|row| !row.contains("user06")));
        assert!(screen[9].contains("Quit"));
    }

    #[test]
    fn malformed_line_is_rendered_with_error() {
        let mut state = ConsoleState::new(ThemeKind::Light, Local::now(), "decoy".into(), 2222, false, 12);
        handle_feed(&mut state, "not-json".into());
        let screen = render(&state, 120, 12);
        assert!(screen[3].contains("not-json error:"));
        assert!(screen[0].contains("1 malformed"));
    }
}
