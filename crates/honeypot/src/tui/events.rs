use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::tui::state::{feed_height, ConsoleState, FeedLine, UiEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Map a raw terminal event to one the console cares about.
pub fn ui_event_from(event: CEvent) -> Option<UiEvent> {
    match event {
        CEvent::Key(key) if is_quit(&key) => Some(UiEvent::Quit),
        CEvent::Resize(_, height) => Some(UiEvent::Resize { height }),
        _ => None,
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => true,
        (KeyCode::Char('q'), _) | (KeyCode::Char('Q'), _) | (KeyCode::Esc, _) => true,
        _ => false,
    }
}

pub fn handle_ui(state: &mut ConsoleState, event: UiEvent) -> Flow {
    match event {
        UiEvent::Quit => Flow::Quit,
        UiEvent::Resize { height } => {
            state.scrollback.resize(feed_height(height));
            Flow::Continue
        }
    }
}

pub fn handle_feed(state: &mut ConsoleState, raw: String) {
    let line = FeedLine::from_published(&raw);
    match &line {
        FeedLine::Attempt(row) => {
            state.total += 1;
            state.sources.insert(row.source.clone());
        }
        FeedLine::Malformed { .. } => state.malformed += 1,
    }
    state.scrollback.push(line);
}
