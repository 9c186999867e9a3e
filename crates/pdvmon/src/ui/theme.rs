//! Shared theme utilities for the pdvmon board.
//!
//! Provides consistent styling across all UI components.

use pdvmon_core::{Highlight, LogEntry, LogLevel, MediaState};
use ratatui::style::{Color, Modifier, Style};

/// Style for one log line.
///
/// Terminal data lines are colored by receipt marker; other entries by
/// level.
pub fn log_style(entry: &LogEntry) -> Style {
    match entry.level {
        LogLevel::Data => highlight_style(entry.highlight()),
        LogLevel::Info => Style::default().fg(Color::Gray),
        LogLevel::Error => Style::default().fg(Color::Red),
        LogLevel::Alert => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    }
}

/// Style for a receipt marker.
///
/// - Totals: bold green
/// - Drawer opening: bold red, it may be unattended cash
/// - Reports and discounts: magenta
/// - New sale: cyan
/// - Payment: blue
pub fn highlight_style(highlight: Highlight) -> Style {
    match highlight {
        Highlight::Plain => Style::default(),
        Highlight::Total => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        Highlight::DrawerOpen => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::BOLD),
        Highlight::Report | Highlight::Discount => Style::default().fg(Color::Magenta),
        Highlight::NewSale => Style::default().fg(Color::Cyan),
        Highlight::Payment => Style::default().fg(Color::Blue),
    }
}

/// Color of the media state indicator.
pub fn media_color(state: MediaState) -> Color {
    match state {
        MediaState::Idle => Color::DarkGray,
        MediaState::Connecting | MediaState::AwaitingOffer | MediaState::Negotiating => {
            Color::Yellow
        }
        MediaState::Connected => Color::Green,
        MediaState::Failed => Color::Red,
        MediaState::Closed => Color::Gray,
    }
}

/// Border style of a slot panel.
pub fn panel_border(selected: bool, alerted: bool) -> Style {
    if alerted {
        Style::default().fg(Color::Red)
    } else if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Alert banner style; the banner blinks by hiding on alternate ticks.
pub fn banner_style() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(Color::Red)
        .add_modifier(Modifier::BOLD)
}
