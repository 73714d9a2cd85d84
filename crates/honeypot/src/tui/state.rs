use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Local};
use common::{display_safe, format_timestamp, pad_column, parse_record, Attempt};

use crate::tui::draw::ThemeKind;

/// Rows of the feed block not available for attempts: two borders plus the
/// column header.
pub const HEADER_RESERVE: u16 = 3;
/// Rows outside the feed block (status line and footer).
pub const CHROME_ROWS: u16 = 2;

pub const DATE_COLUMN: usize = 25;
pub const USER_COLUMN: usize = 20;
pub const PASSWORD_COLUMN: usize = 20;

#[derive(Clone, Debug)]
pub enum UiEvent {
    Quit,
    Resize { height: u16 },
}

/// One formatted attempt, each column already padded to its width.
#[derive(Clone, Debug, PartialEq)]
pub struct AttemptRow {
    pub timestamp: String,
    pub user: String,
    pub password: String,
    pub source: String,
    pub place: String,
}

impl AttemptRow {
    pub fn format(a: &Attempt) -> Self {
        Self {
            timestamp: pad_column(&format_timestamp(&a.timestamp), DATE_COLUMN, ' '),
            user: pad_column(&display_safe(&a.username), USER_COLUMN, ' '),
            password: pad_column(&display_safe(&a.password), PASSWORD_COLUMN, ' '),
            source: display_safe(&a.source_address).into_owned(),
            place: format!(
                "({}, {}, {})",
                display_safe(&a.location.city),
                display_safe(&a.location.region),
                display_safe(&a.location.country)
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedLine {
    Attempt(AttemptRow),
    /// A published line that could not be decoded; shown rather than dropped.
    Malformed { raw: String, error: String },
}

impl FeedLine {
    pub fn from_published(raw: &str) -> Self {
        match parse_record(raw) {
            Ok(attempt) => FeedLine::Attempt(AttemptRow::format(&attempt)),
            Err(e) => FeedLine::Malformed {
                raw: display_safe(raw).into_owned(),
                error: e.to_string(),
            },
        }
    }
}

pub fn column_header() -> String {
    format!(
        "{} {} {} IP Address and Location",
        pad_column("Date", DATE_COLUMN, ' '),
        pad_column("User", USER_COLUMN, ' '),
        pad_column("Password", PASSWORD_COLUMN, ' '),
    )
}

/// FIFO window of the most recent feed lines, sized to the visible rows.
#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<FeedLine>,
    capacity: usize,
}

impl Scrollback {
    /// `visible_height` is the full height of the feed block.
    pub fn for_height(visible_height: u16) -> Self {
        let capacity = capacity_for(visible_height);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedLine> {
        self.lines.iter()
    }

    pub fn push(&mut self, line: FeedLine) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Keep the newest lines that still fit after a resize.
    pub fn resize(&mut self, visible_height: u16) {
        self.capacity = capacity_for(visible_height);
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

fn capacity_for(visible_height: u16) -> usize {
    visible_height.saturating_sub(HEADER_RESERVE) as usize
}

/// Height of the feed block for a terminal of `terminal_height` rows.
pub fn feed_height(terminal_height: u16) -> u16 {
    terminal_height.saturating_sub(CHROME_ROWS)
}

pub struct ConsoleState {
    pub theme: ThemeKind,
    pub started_at: DateTime<Local>,
    pub host: String,
    pub port: u16,
    pub geo_enabled: bool,
    pub scrollback: Scrollback,
    pub total: u64,
    pub malformed: u64,
    pub sources: HashSet<String>,
}

impl ConsoleState {
    pub fn new(
        theme: ThemeKind,
        started_at: DateTime<Local>,
        host: String,
        port: u16,
        geo_enabled: bool,
        terminal_height: u16,
    ) -> Self {
        Self {
            theme,
            started_at,
            host,
            port,
            geo_enabled,
            scrollback: Scrollback::for_height(feed_height(terminal_height)),
            total: 0,
            malformed: 0,
            sources: HashSet::new(),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "SSH Honeypot - Started: {} on port {}",
            self.started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.port
        )
    }
}
