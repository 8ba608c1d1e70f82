use ratatui::style::{Color, Modifier, Style};
use seed_core::{ChatRole, LogLevel};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const ACTIVE_TAB_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const STATUS_ROW_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::ITALIC);
pub const RESIZER_STYLE: Style = Style::new().fg(Color::Rgb(69, 133, 136));
pub const RESIZER_ACTIVE_STYLE: Style = Style::new()
    .fg(Color::Rgb(250, 189, 47))
    .add_modifier(Modifier::BOLD);

pub mod icons {
    pub const LINK_UP: &str = "●";
    pub const LINK_DOWN: &str = "○";
    pub const WORKING: &str = "…";
    pub const TICK_OK: &str = "+";
    pub const TICK_FAILED: &str = "x";
}

pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Rgb(131, 165, 152),
        LogLevel::Success => Color::Rgb(184, 187, 38),
        LogLevel::Warning => Color::Rgb(250, 189, 47),
        LogLevel::Error => Color::Rgb(254, 128, 25),
        LogLevel::Debug => Color::Rgb(146, 131, 116),
        LogLevel::Code => Color::Rgb(211, 134, 155),
        LogLevel::Command => Color::Rgb(142, 192, 124),
        LogLevel::Strategy => Color::Rgb(69, 133, 136),
    }
}

pub fn role_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::new()
            .fg(Color::Rgb(142, 192, 124))
            .add_modifier(Modifier::BOLD),
        ChatRole::Agent => Style::new().fg(Color::Rgb(189, 174, 147)),
        ChatRole::System => Style::new().fg(Color::Rgb(146, 131, 116)),
        ChatRole::Error => Style::new().fg(Color::Rgb(254, 128, 25)),
    }
}

pub fn role_prefix(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "you",
        ChatRole::Agent => "ai",
        ChatRole::System => "sys",
        ChatRole::Error => "err",
    }
}

pub fn link_style(up: bool) -> Style {
    if up {
        Style::new().fg(Color::Rgb(184, 187, 38))
    } else {
        Style::new().fg(Color::Rgb(214, 93, 14))
    }
}
