//! Header and footer bars for the pdvmon board.
//!
//! - Header: title, backend status and alert counters
//! - Footer: key hints, the active edit, or the last command failure

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

/// Renders the header bar.
pub fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let status_style = if app.view.server_connected {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };

    let mut spans = vec![
        Span::styled(
            "pdvmon",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(app.view.server_status.clone(), status_style),
    ];

    if !app.view.server_address.is_empty() {
        spans.push(Span::styled(
            format!(" ({})", app.view.server_address),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let live = app.session.live_media;
    if live > 0 {
        spans.push(Span::styled(
            format!(" | {live} feed{}", if live == 1 { "" } else { "s" }),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let alerts = app.session.alerts.len() + app.session.queued_alerts;
    if alerts > 0 {
        spans.push(Span::styled(
            format!(" | {alerts} alert{}", if alerts == 1 { "" } else { "s" }),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(status_style),
    );
    frame.render_widget(header, area);
}

/// Renders the footer bar.
pub fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(edit) = &app.edit {
        Line::from(vec![
            Span::styled(
                format!(" {} [Camera {}]: ", edit.field.label(), edit.slot),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(edit.buffer.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("  Enter save  Esc cancel", Style::default().fg(Color::DarkGray)),
        ])
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(format!(" {notice}"), Style::default().fg(Color::Red)))
    } else {
        hints()
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(footer, area);
}

fn hints() -> Line<'static> {
    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let sep_style = Style::default().fg(Color::DarkGray);

    let pairs = [
        ("1-9", "slot"),
        ("s/u/t", "edit"),
        ("c/d", "server"),
        ("r", "register"),
        ("v/x", "feed"),
        ("Q", "quality"),
        ("a", "dismiss"),
        ("q", "quit"),
    ];

    let mut spans = Vec::with_capacity(pairs.len() * 3);
    for (i, (key, label)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", sep_style));
        }
        spans.push(Span::styled(format!(" {key}"), key_style));
        spans.push(Span::raw(format!(" {label}")));
    }
    Line::from(spans)
}
