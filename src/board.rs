//! Maps pointer positions on the terminal onto grid dots.

use ratatui::layout::Rect;

use crate::pattern::Dot;

// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;

/// The 3×3 grid laid out over a rectangle of terminal cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    area: Rect,
    tolerance: f64,
}

impl BoardGeometry {
    /// `tolerance` is the snap radius in rows; columns count half.
    pub fn new(area: Rect, tolerance: f64) -> Self {
        Self { area, tolerance }
    }

    /// Largest roughly-square board that fits in `outer`, centered.
    pub fn fit(outer: Rect, tolerance: f64) -> Self {
        let width = outer.width.min(outer.height.saturating_mul(2));
        let height = outer.height.min(width / 2);
        let area = Rect::new(
            outer.x + (outer.width - width) / 2,
            outer.y + (outer.height - height) / 2,
            width,
            height,
        );
        Self::new(area, tolerance)
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.area.x
            && column < self.area.x + self.area.width
            && row >= self.area.y
            && row < self.area.y + self.area.height
    }

    /// Terminal cell at the center of `dot`.
    pub fn dot_center(&self, dot: Dot) -> (u16, u16) {
        let column = self.area.x + self.area.width * (2 * dot.col() as u16 + 1) / 6;
        let row = self.area.y + self.area.height * (2 * dot.row() as u16 + 1) / 6;
        (column, row)
    }

    /// Nearest dot within the snap radius of the pointer, if any.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<Dot> {
        Dot::ALL
            .iter()
            .map(|&dot| (dot, self.distance(dot, column, row)))
            .filter(|&(_, distance)| distance <= self.tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(dot, _)| dot)
    }

    fn distance(&self, dot: Dot, column: u16, row: u16) -> f64 {
        let (cx, cy) = self.dot_center(dot);
        let dx = (f64::from(column) - f64::from(cx)) / CELL_ASPECT;
        let dy = f64::from(row) - f64::from(cy);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Phone keypad layout: `1` is the top-left dot, `9` the bottom-right.
pub fn keypad_dot(c: char) -> Option<Dot> {
    let digit = c.to_digit(10)?;
    if digit == 0 {
        return None;
    }
    Dot::new(digit as u8 - 1)
}
