use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use patlock::board::BoardGeometry;
use patlock::runtime::{FixedTicker, PatternEvent, Runner, TestEventSource};
use patlock::{Dot, MemoryStorage, Outcome, Phase, Session, SessionConfig, Stats, TOTAL_PATTERNS};
use ratatui::layout::Rect;

fn mouse(kind: MouseEventKind, (column, row): (u16, u16)) -> PatternEvent {
    PatternEvent::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

fn center(board: &BoardGeometry, id: u8) -> (u16, u16) {
    board.dot_center(Dot::new(id).unwrap())
}

// Drives a session from pointer events through the runner, the way the
// terminal front end does, without a TTY.
fn drive(
    session: &mut Session<MemoryStorage>,
    board: &BoardGeometry,
    runner: &Runner<TestEventSource, FixedTicker>,
    steps: u32,
) {
    for _ in 0..steps {
        let now = Instant::now();
        match runner.step() {
            PatternEvent::Tick => {
                session.tick(now);
            }
            PatternEvent::Mouse(ev) => {
                let dot = board.hit_test(ev.column, ev.row);
                match ev.kind {
                    MouseEventKind::Down(_) => {
                        session.pointer_down(dot);
                    }
                    MouseEventKind::Drag(_) => {
                        session.pointer_move(dot);
                    }
                    MouseEventKind::Up(_) => {
                        session.pointer_up(now);
                    }
                    _ => {}
                }
            }
            PatternEvent::Key(_) | PatternEvent::Resize => {}
        }
    }
}

#[test]
fn headless_pointer_flow_reaches_validation() {
    let board = BoardGeometry::new(Rect::new(0, 0, 30, 15), 1.5);
    let mut session = Session::open(MemoryStorage::new(), SessionConfig::default());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(mouse(MouseEventKind::Down(MouseButton::Left), center(&board, 0)))
        .unwrap();
    // sweep across the top row with intermediate samples
    for column in 6..=25 {
        tx.send(mouse(MouseEventKind::Drag(MouseButton::Left), (column, 2)))
            .unwrap();
    }
    tx.send(mouse(MouseEventKind::Drag(MouseButton::Left), center(&board, 5)))
        .unwrap();
    tx.send(mouse(MouseEventKind::Drag(MouseButton::Left), center(&board, 8)))
        .unwrap();
    tx.send(mouse(MouseEventKind::Up(MouseButton::Left), center(&board, 8)))
        .unwrap();

    drive(&mut session, &board, &runner, 30);

    assert_eq!(session.pattern().to_string(), "0-1-2-5-8");
    assert_eq!(session.phase(), Phase::AwaitingValidation);

    assert!(session.mark_invalid(Instant::now()));
    assert_eq!(session.stats(), Stats { tested: 1, invalid: 1 });
    assert_eq!(session.remaining(), TOTAL_PATTERNS - 1);
}

#[test]
fn headless_duplicate_clears_after_delay() {
    let board = BoardGeometry::new(Rect::new(0, 0, 30, 15), 1.5);
    let storage = MemoryStorage::with_contents(r#"["6-4-2-5"]"#);
    let config = SessionConfig {
        dismiss_delay: Duration::from_millis(20),
    };
    let mut session = Session::open(storage, config);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(mouse(MouseEventKind::Down(MouseButton::Left), center(&board, 6)))
        .unwrap();
    tx.send(mouse(MouseEventKind::Drag(MouseButton::Left), center(&board, 2)))
        .unwrap();
    tx.send(mouse(MouseEventKind::Drag(MouseButton::Left), center(&board, 5)))
        .unwrap();
    tx.send(mouse(MouseEventKind::Up(MouseButton::Left), center(&board, 5)))
        .unwrap();

    drive(&mut session, &board, &runner, 4);
    assert_eq!(session.phase(), Phase::Resolved(Outcome::Duplicate));
    assert_eq!(session.stats(), Stats { tested: 1, invalid: 1 });

    // nothing else queued: the runner ticks until the dismissal fires
    for _ in 0..50u32 {
        if session.phase() == Phase::Idle {
            break;
        }
        drive(&mut session, &board, &runner, 1);
    }
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.pattern().is_empty());
}
