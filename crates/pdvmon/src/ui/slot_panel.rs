//! One slot's panel: status, source, alert banner and the event log tail.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use pdvmon_core::SlotId;
use pdvmon_session::SlotView;

use super::theme;
use crate::app::App;

/// Renders `slot` into `area`.
///
/// Only the newest log lines that fit are shown.
pub fn render_slot_panel(frame: &mut Frame, area: Rect, app: &App, slot: SlotId) {
    let Some(view) = app.view.slot(slot) else {
        return;
    };
    let selected = app.selected == slot;
    let media = app.media_state(slot);

    let mut title = vec![Span::styled(
        format!(" Camera {slot} "),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(address) = app.session.address_of(slot) {
        title.push(Span::raw(format!("| {} ", address.label())));
    }
    title.push(Span::styled(
        format!("| {media} "),
        Style::default().fg(theme::media_color(media)),
    ));
    if media.is_live() {
        title.push(Span::raw(format!("| {} ", app.quality(slot))));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(selected, view.banner.is_some()))
        .title(Line::from(title));

    let inner_height = usize::from(block.inner(area).height);
    let lines = panel_lines(view, app.blink_visible, inner_height);

    let panel = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn panel_lines(view: &SlotView, blink_visible: bool, height: usize) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().add_modifier(Modifier::DIM)),
        Span::raw(view.status.clone()),
    ])];

    let source = if view.source_url.is_empty() {
        "-".to_string()
    } else {
        view.source_url.clone()
    };
    lines.push(Line::from(vec![
        Span::styled("Source: ", Style::default().add_modifier(Modifier::DIM)),
        Span::raw(source),
    ]));

    if let Some(banner) = &view.banner {
        if blink_visible {
            lines.push(Line::from(Span::styled(
                format!(" {banner} "),
                theme::banner_style(),
            )));
        } else {
            lines.push(Line::from(""));
        }
    }

    let room = height.saturating_sub(lines.len());
    let skip = view.log.len().saturating_sub(room);
    lines.extend(
        view.log
            .iter()
            .skip(skip)
            .map(|entry| Line::from(Span::styled(entry.render(), theme::log_style(entry)))),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdvmon_core::LogEntry;

    fn view_with_log(n: usize) -> SlotView {
        let mut view = SlotView {
            status: "Connected - PDV 05 (10.0.0.5)".to_string(),
            ..Default::default()
        };
        for i in 0..n {
            view.log.push_back(LogEntry::data(format!("line {i}")));
        }
        view
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_log_tail_fits_height() {
        let lines = panel_lines(&view_with_log(20), true, 6);
        assert_eq!(lines.len(), 6);
        assert!(text(&lines[0]).contains("Connected - PDV 05"));
        assert!(text(&lines[5]).ends_with("line 19"));
        assert!(text(&lines[2]).ends_with("line 16"));
    }

    #[test]
    fn test_banner_blinks() {
        let mut view = view_with_log(0);
        view.banner = Some("PDV 05 inactive for 90s".to_string());

        let shown = panel_lines(&view, true, 10);
        assert_eq!(text(&shown[2]), " PDV 05 inactive for 90s ");

        let hidden = panel_lines(&view, false, 10);
        assert_eq!(hidden.len(), 3);
        assert_eq!(text(&hidden[2]), "");
    }

    #[test]
    fn test_empty_source_shows_dash() {
        let lines = panel_lines(&view_with_log(0), true, 10);
        assert_eq!(text(&lines[1]), "Source: -");
    }
}
