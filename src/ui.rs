pub mod board_view;

use std::rc::Rc;

use patlock::{board::BoardGeometry, Outcome, Phase};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{App, Mode};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

fn layout(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(4), // counters
            Constraint::Min(9),    // grid
            Constraint::Length(5), // status
            Constraint::Length(1), // legend
        ])
        .split(area)
}

/// Lays out the frame, remembers where the grid landed for pointer
/// resolution, then renders.
pub fn ui(app: &mut App, f: &mut Frame) {
    let chunks = layout(f.area());
    app.board = Some(BoardGeometry::fit(chunks[2], app.config.hit_tolerance));
    f.render_widget(&*app, f.area());
}

pub fn pattern_color(phase: Phase) -> Color {
    match phase {
        Phase::Resolved(Outcome::Invalid) => Color::Red,
        Phase::Resolved(Outcome::Valid) => Color::Green,
        Phase::Resolved(Outcome::Duplicate) => Color::Yellow,
        Phase::Idle | Phase::Drawing | Phase::AwaitingValidation => Color::White,
    }
}

/// 389112 -> "389,112"
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = layout(area);
        let phase = self.session.phase();

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        Paragraph::new(vec![
            Line::from(Span::styled("Pattern Memory Test", bold_style)),
            Line::from(Span::styled(
                "Test patterns systematically to find your forgotten lock",
                dim_style,
            )),
        ])
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        let stats = self.session.stats();
        let counters = [
            (stats.tested.to_string(), "Tested"),
            (stats.invalid.to_string(), "Invalid"),
            (group_thousands(self.session.remaining()), "Remaining"),
        ];
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(chunks[1]);
        for ((value, label), column) in counters.into_iter().zip(columns.iter()) {
            Paragraph::new(vec![
                Line::from(Span::styled(value, bold_style)),
                Line::from(Span::styled(label, dim_style)),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(*column, buf);
        }

        let board = self
            .board
            .unwrap_or_else(|| BoardGeometry::fit(chunks[2], self.config.hit_tolerance));
        let trail = if phase == Phase::Drawing {
            self.pointer
        } else {
            None
        };
        board_view::render_board(
            &board,
            self.session.pattern(),
            pattern_color(phase),
            trail,
            buf,
        );

        status_panel(self)
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(chunks[3], buf);

        Paragraph::new(Span::styled(
            "drag or 1-9 draw · enter release · y/n judge · esc dismiss · e export · R reset · q quit",
            dim_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }
}

fn status_panel(app: &App) -> Paragraph<'static> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let heading = |text: &'static str, color: Color| {
        Line::from(Span::styled(text, bold_style.fg(color)))
    };

    if app.mode == Mode::ConfirmReset {
        return Paragraph::new(vec![
            heading("Delete all saved patterns? This cannot be undone.", Color::Red),
            Line::from("press y to confirm, any other key to cancel"),
        ]);
    }

    let mut lines = match app.session.phase() {
        Phase::AwaitingValidation => vec![
            heading("Is this your correct pattern?", Color::White),
            Line::from("y = yes, n = no · start a new drawing to try again"),
        ],
        Phase::Resolved(Outcome::Duplicate) => vec![
            heading("Already Tested", Color::Yellow),
            Line::from("You've marked this pattern as incorrect before"),
        ],
        Phase::Resolved(Outcome::Valid) => vec![
            heading("Pattern Found!", Color::Green),
            Line::from("This is your correct pattern"),
        ],
        Phase::Resolved(Outcome::Invalid) => vec![
            heading("Pattern Marked Invalid", Color::Red),
            Line::from("This pattern won't be suggested again"),
        ],
        Phase::Drawing => vec![Line::from(format!(
            "{} dots: {}",
            app.session.pattern().len(),
            app.session.pattern()
        ))],
        Phase::Idle => vec![Line::from(
            "Draw a pattern by connecting at least 4 dots. Release to test.",
        )],
    };

    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    Paragraph::new(lines)
}
