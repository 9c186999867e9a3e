//! UI rendering for the pdvmon board.
//!
//! # Layout Structure
//!
//! ```text
//! +--------------------------------------------------+
//! |  Header: backend status, feeds, alerts           |  <- 3 lines
//! +------------------------+-------------------------+
//! | Camera 1 | PDV 05 | .. | Camera 2                |
//! |  Status / Source       |                         |
//! |  log tail              |                         |
//! +------------------------+-------------------------+
//! | Camera 3               | Camera 4                |
//! +------------------------+-------------------------+
//! |  Footer: key hints / edit line                   |  <- 3 lines
//! +--------------------------------------------------+
//! ```
//!
//! While a slot holds the exclusive presentation grant, it fills the whole
//! board and the other panels are hidden.

pub mod layout;
pub mod slot_panel;
pub mod status_bar;
pub mod theme;

use ratatui::Frame;

use crate::app::App;
use layout::AppLayout;

pub use slot_panel::render_slot_panel;
pub use status_bar::{render_footer, render_header};

/// Renders the complete board.
pub fn render(frame: &mut Frame, app: &App) {
    let layout = AppLayout::new(frame.area());

    render_header(frame, layout.header, app);
    render_footer(frame, layout.footer, app);

    let slots = app.visible_slots();
    for (slot, area) in slots.iter().zip(layout::grid(layout.board, slots.len())) {
        render_slot_panel(frame, area, app, *slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdvmon_core::{LogEntry, SlotId, SlotLayout};
    use pdvmon_session::{PresentationPort, SlotBoard};
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn test_render_initial_board() {
        let layout = SlotLayout::new(4).unwrap();
        let app = App::new(layout, SlotBoard::new(layout));

        let text = draw(&app);
        for n in 1..=4 {
            assert!(text.contains(&format!("Camera {n}")));
        }
        assert!(text.contains("Disconnected"));
    }

    #[test]
    fn test_render_log_lines() {
        let layout = SlotLayout::new(4).unwrap();
        let mut board = SlotBoard::new(layout);
        board.append_slot_log(SlotId::new(2), LogEntry::data("VENDA 12.50"));
        let mut app = App::new(layout, board);
        app.refresh(None);

        assert!(draw(&app).contains("VENDA 12.50"));
    }

    #[test]
    fn test_render_exclusive_slot_alone() {
        let layout = SlotLayout::new(4).unwrap();
        let mut board = SlotBoard::new(layout);
        board.set_exclusive_presentation(SlotId::new(3), true);
        board.set_alert_banner(SlotId::new(3), Some("PDV 07 inactive for 90s"));
        let mut app = App::new(layout, board);
        app.refresh(None);

        let text = draw(&app);
        assert!(text.contains("Camera 3"));
        assert!(!text.contains("Camera 1"));
        assert!(text.contains("PDV 07 inactive for 90s"));
    }

    #[test]
    fn test_render_edit_line() {
        let layout = SlotLayout::new(1).unwrap();
        let mut app = App::new(layout, SlotBoard::new(layout));
        app.begin_edit(crate::app::EditField::Server);
        app.edit_push('h');

        assert!(draw(&app).contains("Server [Camera 1]: h"));
    }

    #[test]
    fn test_render_tiny_terminal_does_not_panic() {
        let layout = SlotLayout::new(9).unwrap();
        let app = App::new(layout, SlotBoard::new(layout));
        let mut terminal = Terminal::new(TestBackend::new(10, 5)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();
    }
}
