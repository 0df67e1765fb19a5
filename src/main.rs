pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use patlock::{
    app_dirs::AppDirs,
    board::{keypad_dot, BoardGeometry},
    config::{Config, ConfigStore, FileConfigStore},
    export::ExportDocument,
    logging::init_logging,
    pattern::{classify, Classification, MIN_PATTERN_LEN},
    runtime::{CrosstermEventSource, FixedTicker, PatternEvent, Runner},
    session::SessionEvent,
    Confirmation, FileStorage, PatlockError, PatternKey, RejectedStore, Session, SessionConfig,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};
use tracing::info;

const TICK_RATE_MS: u64 = 100;

/// test forgotten android unlock patterns one by one and track what is left
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Draw candidate unlock patterns on a 3x3 grid, mark each one you have tried on the device as wrong, and watch the remaining search space shrink. History is stored locally and never leaves the machine."
)]
pub struct Cli {
    /// file holding the rejected pattern history
    #[clap(long, global = true)]
    state_file: Option<PathBuf>,

    /// config file to read settings from
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// how long a result stays on screen before clearing, in milliseconds
    #[clap(long, global = true)]
    dismiss_ms: Option<u64>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// print tested / invalid / remaining counts
    Stats,
    /// report whether a pattern (e.g. 0-1-2-5-8) was already rejected
    Check { key: PatternKey },
    /// record a pattern as wrong without drawing it
    Reject { key: PatternKey },
    /// write the full history to a timestamped JSON file
    Export {
        /// directory to write into (defaults to the configured export dir)
        #[clap(long)]
        dir: Option<PathBuf>,
    },
    /// delete all saved patterns; this cannot be undone
    Reset {
        /// confirm the deletion
        #[clap(long)]
        yes: bool,
    },
}

impl Cli {
    fn state_path(&self) -> Result<PathBuf, PatlockError> {
        self.state_file
            .clone()
            .or_else(AppDirs::state_path)
            .ok_or(PatlockError::StateDirUnavailable)
    }

    fn load_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut config = store.load();
        if let Some(ms) = self.dismiss_ms {
            config.dismiss_delay_ms = ms;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    ConfirmReset,
}

#[derive(Debug)]
pub struct App {
    pub session: Session<FileStorage>,
    pub config: Config,
    pub mode: Mode,
    /// Last laid-out grid, used to resolve pointer positions.
    pub board: Option<BoardGeometry>,
    /// Pointer cell while dragging, for the trailing segment.
    pub pointer: Option<(u16, u16)>,
    pub notice: Option<String>,
    events: Receiver<SessionEvent>,
}

impl App {
    pub fn new(state_path: &Path, config: Config) -> Self {
        let mut session = Session::open(
            FileStorage::with_path(state_path),
            SessionConfig::from(&config),
        );
        let events = session.subscribe();

        Self {
            session,
            config,
            mode: Mode::Normal,
            board: None,
            pointer: None,
            notice: None,
            events,
        }
    }

    /// Drains session notifications; true when the screen is stale.
    pub fn take_changes(&mut self) -> bool {
        self.events.try_iter().count() > 0
    }

    pub fn export(&mut self, dir: Option<&Path>) {
        if self.session.rejected().is_empty() {
            self.notice = Some("Nothing to export yet".to_string());
            return;
        }

        let dir = dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.export_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        let doc = ExportDocument::new(
            self.session.rejected(),
            self.session.stats(),
            chrono::Utc::now(),
        );

        self.notice = Some(match doc.write_to_dir(&dir) {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                format!("Export failed: {err}")
            }
        });
    }

    fn hit_test(&self, column: u16, row: u16) -> Option<patlock::Dot> {
        self.board.and_then(|board| board.hit_test(column, row))
    }
}

#[derive(Debug, PartialEq)]
enum Control {
    Continue,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> Control {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Control::Quit;
    }

    if app.mode == Mode::ConfirmReset {
        let confirmation = if key.code == KeyCode::Char('y') {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        };
        app.mode = Mode::Normal;
        app.notice = app
            .session
            .reset(confirmation)
            .then(|| "All saved patterns deleted".to_string());
        return Control::Continue;
    }

    app.notice = None;
    match key.code {
        KeyCode::Char('q') => return Control::Quit,
        KeyCode::Esc => {
            app.session.dismiss();
        }
        KeyCode::Enter => {
            app.session.pointer_up(now);
        }
        KeyCode::Char('y') => {
            app.session.mark_valid();
        }
        KeyCode::Char('n') => {
            app.session.mark_invalid(now);
        }
        KeyCode::Char('e') => app.export(None),
        KeyCode::Char('R') => {
            if app.session.rejected().is_empty() {
                app.notice = Some("Nothing to reset".to_string());
            } else {
                app.mode = Mode::ConfirmReset;
            }
        }
        KeyCode::Char(c) => {
            if let Some(dot) = keypad_dot(c) {
                if app.session.phase() == patlock::Phase::Drawing {
                    app.session.pointer_move(Some(dot));
                } else {
                    app.session.pointer_down(Some(dot));
                }
            }
        }
        _ => {}
    }
    Control::Continue
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    if app.mode == Mode::ConfirmReset {
        return;
    }

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let on_board = app
                .board
                .is_some_and(|board| board.contains(mouse.column, mouse.row));
            if on_board {
                let dot = app.hit_test(mouse.column, mouse.row);
                if app.session.pointer_down(dot) {
                    app.pointer = Some((mouse.column, mouse.row));
                }
            } else {
                app.notice = None;
                app.session.dismiss();
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.pointer = Some((mouse.column, mouse.row));
            let dot = app.hit_test(mouse.column, mouse.row);
            app.session.pointer_move(dot);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.pointer = None;
            app.session.pointer_up(now);
        }
        _ => {}
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let state_path = cli.state_path()?;
    let config = cli.load_config();

    let log_dir = state_path
        .parent()
        .map(|dir| dir.join("logs"))
        .or_else(AppDirs::log_dir);
    let _log_guard = log_dir.as_deref().and_then(init_logging);

    if let Some(command) = cli.command.clone() {
        return run_command(command, &state_path, &config);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&state_path, config);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_command(command: Command, state_path: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
    let storage = FileStorage::with_path(state_path);
    info!(?command, state = %state_path.display(), "running command");

    match command {
        Command::Stats => {
            let session = Session::open(storage, SessionConfig::from(config));
            let stats = session.stats();
            println!("tested: {}", stats.tested);
            println!("invalid: {}", stats.invalid);
            println!("remaining: {}", session.remaining());
        }
        Command::Check { key } => {
            let store = RejectedStore::open(storage);
            let pattern = key.decode()?;
            println!("{}", classify(&pattern, store.set()));
        }
        Command::Reject { key } => {
            let mut store = RejectedStore::open(storage);
            if classify(&key.decode()?, store.set()) == Classification::TooShort {
                return Err(PatlockError::TooShort {
                    key: key.to_string(),
                    min: MIN_PATTERN_LEN,
                }
                .into());
            }
            if store.insert(key.clone()) {
                println!("rejected {key}");
            } else {
                println!("{key} was already rejected");
            }
        }
        Command::Export { dir } => {
            let session = Session::open(storage, SessionConfig::from(config));
            let dir = dir
                .or_else(|| config.export_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let doc = ExportDocument::new(session.rejected(), session.stats(), chrono::Utc::now());
            let path = doc.write_to_dir(&dir)?;
            println!("{}", path.display());
        }
        Command::Reset { yes } => {
            if !yes {
                return Err(PatlockError::Unconfirmed.into());
            }
            let mut session = Session::open(storage, SessionConfig::from(config));
            session.reset(Confirmation::Confirmed);
            println!("history cleared");
        }
    }

    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui::ui(app, f))?;

    loop {
        let now = Instant::now();
        let mut redraw = match runner.step() {
            PatternEvent::Tick => app.session.tick(now),
            PatternEvent::Resize => true,
            PatternEvent::Mouse(mouse) => {
                handle_mouse(app, mouse, now);
                true
            }
            PatternEvent::Key(key) => {
                if handle_key(app, key, now) == Control::Quit {
                    break;
                }
                true
            }
        };

        redraw |= app.take_changes();
        if redraw {
            terminal.draw(|f| ui::ui(app, f))?;
        }
    }

    Ok(())
}
