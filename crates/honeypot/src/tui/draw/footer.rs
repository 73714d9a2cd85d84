use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::ThemeColors;

pub fn draw_footer(f: &mut ratatui::Frame<'_>, area: Rect, theme: &ThemeColors) {
    let shortcuts = [("Q/Esc", "Quit"), ("Ctrl+C", "Quit")];

    let help_text: Vec<Span> = shortcuts
        .iter()
        .enumerate()
        .flat_map(|(i, (key, desc))| {
            let mut spans = vec![
                Span::styled(
                    key.to_string(),
                    Style::default().fg(theme.primary).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {}", desc), Style::default().fg(theme.muted)),
            ];
            if i < shortcuts.len() - 1 {
                spans.push(Span::styled("  │  ", Style::default().fg(theme.muted)));
            }
            spans
        })
        .collect();

    let footer = Paragraph::new(Line::from(help_text)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}
