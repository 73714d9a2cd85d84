use ratatui::style::Color;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Copy, Debug)]
pub struct ThemeColors {
    pub primary: Color,
    pub muted: Color,
    pub accent: Color,
    pub error: Color,
    pub text: Color,
    // one color per feed column
    pub timestamp: Color,
    pub user: Color,
    pub password: Color,
    pub source: Color,
}

pub fn get_theme(kind: ThemeKind) -> ThemeColors {
    match kind {
        ThemeKind::Dark => ThemeColors {
            // Tailwind-esque dark palette
            primary: Color::Rgb(79, 172, 254),
            muted: Color::Rgb(156, 163, 175),
            accent: Color::Rgb(168, 85, 247),
            error: Color::Rgb(239, 68, 68),
            text: Color::Rgb(243, 244, 246),    // slate-100
            timestamp: Color::Rgb(79, 172, 254),
            user: Color::Rgb(34, 197, 94),
            password: Color::Rgb(239, 68, 68),
            source: Color::Rgb(251, 191, 36),
        },
        ThemeKind::Light => ThemeColors {
            primary: Color::Rgb(37, 99, 235),   // blue-600
            muted: Color::Rgb(100, 116, 139),   // slate-500
            accent: Color::Rgb(124, 58, 237),   // violet-600
            error: Color::Rgb(220, 38, 38),     // red-600
            text: Color::Rgb(15, 23, 42),       // slate-900
            timestamp: Color::Rgb(37, 99, 235),
            user: Color::Rgb(22, 163, 74),
            password: Color::Rgb(220, 38, 38),
            source: Color::Rgb(180, 83, 9),     // amber-700
        },
    }
}
