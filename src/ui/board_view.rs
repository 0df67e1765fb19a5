use patlock::{board::BoardGeometry, Dot, Pattern};
use ratatui::{
    buffer::Buffer,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Widget,
    },
};

/// Draws the nine dots, the segments joining the selected ones and, while
/// dragging, a trailing segment to the pointer.
pub fn render_board(
    board: &BoardGeometry,
    pattern: &Pattern,
    color: Color,
    trail: Option<(u16, u16)>,
    buf: &mut Buffer,
) {
    let area = board.area();
    if area.width < 3 || area.height < 3 {
        return;
    }

    // canvas units are cells, with y pointing up
    let max_x = f64::from(area.width - 1);
    let max_y = f64::from(area.height - 1);
    let to_canvas = |(column, row): (u16, u16)| {
        (
            f64::from(column.saturating_sub(area.x)),
            max_y - f64::from(row.saturating_sub(area.y)),
        )
    };

    let selected = pattern.dots();
    let trail_from = pattern.last().zip(trail);

    Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, max_x])
        .y_bounds([0.0, max_y])
        .paint(|ctx| {
            for pair in selected.windows(2) {
                let (x1, y1) = to_canvas(board.dot_center(pair[0]));
                let (x2, y2) = to_canvas(board.dot_center(pair[1]));
                ctx.draw(&CanvasLine { x1, y1, x2, y2, color });
            }
            if let Some((last, pointer)) = trail_from {
                let (x1, y1) = to_canvas(board.dot_center(last));
                let (x2, y2) = to_canvas(pointer);
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: Color::DarkGray,
                });
            }

            ctx.layer();
            for dot in Dot::ALL {
                let (x, y) = to_canvas(board.dot_center(dot));
                let glyph = if pattern.contains(dot) {
                    Span::styled("●", Style::default().fg(color).add_modifier(Modifier::BOLD))
                } else {
                    Span::styled("○", Style::default().fg(Color::Gray))
                };
                ctx.print(x, y, glyph);
            }
        })
        .render(area, buf);
}
