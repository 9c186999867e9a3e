//! Layout helpers for the pdvmon board.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main application layout areas.
///
/// - Header (3 lines): title and backend status
/// - Board (fills remaining): slot grid
/// - Footer (3 lines): key hints or the active edit
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub header: Rect,
    pub board: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let [header, board, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .areas(area);

        Self {
            header,
            board,
            footer,
        }
    }
}

/// Columns used for `count` panels: the smallest square-ish grid.
///
/// 1 → 1, 2 → 2, 3-4 → 2, 5-6 → 3, 7-9 → 3.
pub fn grid_columns(count: usize) -> usize {
    let mut columns = 1;
    while columns * columns < count {
        columns += 1;
    }
    columns
}

/// Splits `area` into `count` cells, row-major.
pub fn grid(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let columns = grid_columns(count);
    let rows = count.div_ceil(columns);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    row_areas
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
                .split(*row)
                .to_vec()
        })
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_layout_creation() {
        let layout = AppLayout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.header.height, 3);
        assert_eq!(layout.footer.height, 3);
        assert_eq!(layout.footer.y + layout.footer.height, 24);
        assert_eq!(layout.board.y, 3);
        assert_eq!(layout.board.height, 18);
    }

    #[test]
    fn test_grid_columns() {
        assert_eq!(grid_columns(1), 1);
        assert_eq!(grid_columns(2), 2);
        assert_eq!(grid_columns(4), 2);
        assert_eq!(grid_columns(5), 3);
        assert_eq!(grid_columns(9), 3);
    }

    #[test]
    fn test_four_slots_make_quadrants() {
        let cells = grid(Rect::new(0, 0, 80, 20), 4);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0], Rect::new(0, 0, 40, 10));
        assert_eq!(cells[3], Rect::new(40, 10, 40, 10));
    }

    #[test]
    fn test_partial_last_row() {
        let cells = grid(Rect::new(0, 0, 90, 20), 5);
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[4].y, 10);
    }

    #[test]
    fn test_single_slot_fills_area() {
        let area = Rect::new(0, 3, 80, 18);
        assert_eq!(grid(area, 1), vec![area]);
    }
}
