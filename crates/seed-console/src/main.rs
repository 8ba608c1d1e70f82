use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use seed_console::{
    commands::{parse_input, ConsoleCommand},
    config::{Args, Config},
    panel::{PanelResizeController, PreferenceFile},
    service::{spawn_action, spawn_status, ServiceClient, ServiceEvent},
    session::ConsoleSession,
    ui::{self, ChatTab, DebugTab, ViewState},
};
use seed_core::console_ipc::ControlAction;
use seed_core::LogLevel;
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

const SERVICE_EVENT_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    let _log_guard = init_logging(&config);
    info!(event = "console_start", ws_url = %config.ws_url, service_url = %config.service_url);

    let service = ServiceClient::new(&config.service_url)?;
    let mut terminal = setup_terminal()?;
    let rows = terminal.size().map(|area| area.height).unwrap_or(24);
    let panel = PanelResizeController::restore(PreferenceFile::new(config.preferences_path()), rows)
        .with_reserved_rows(ui::RESERVED_ROWS);
    let mut session = ConsoleSession::new(&config, panel);

    let result = run(&mut terminal, &mut session, &config, service).await;
    session.stop().await;
    restore_terminal(&mut terminal)?;

    if let Err(err) = result {
        eprintln!("seed-console: {err}");
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

struct Services {
    client: ServiceClient,
    events: mpsc::Sender<ServiceEvent>,
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut ConsoleSession,
    config: &Config,
    client: ServiceClient,
) -> Result<()> {
    let mut view = ViewState::default();
    let mut events = EventStream::new();
    let mut transport_rx = session.start();
    let mut timer_rx = session
        .take_timers()
        .context("session timers already taken")?;
    let (service_tx, mut service_rx) = mpsc::channel(SERVICE_EVENT_CAPACITY);
    let services = Services {
        client,
        events: service_tx,
    };
    let mut status_ticker = tokio::time::interval(config.status_poll_interval);

    loop {
        terminal.draw(|f| ui::render(f, session, &view))?;
        if view.should_quit {
            break;
        }

        tokio::select! {
            _ = status_ticker.tick() => {
                spawn_status(services.client.clone(), services.events.clone());
            }
            Some(event) = transport_rx.recv() => {
                session.apply_transport_event(event);
            }
            Some(event) = service_rx.recv() => {
                session.apply_service_event(event);
            }
            Some(timer) = timer_rx.recv() => {
                session.apply_timer(timer);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => {
                        let area = terminal.size()?;
                        handle_event(event, area, session, &mut view, &services);
                    }
                    Some(Err(err)) => {
                        warn!(event = "terminal_event_error", error = %err);
                    }
                    None => break,
                }
            }
        }
    }
    Ok(())
}

fn handle_event(
    event: Event,
    area: Rect,
    session: &mut ConsoleSession,
    view: &mut ViewState,
    services: &Services,
) {
    match event {
        Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
            handle_key(key, session, view, services);
        }
        Event::Mouse(mouse) => handle_mouse(mouse, area, session),
        Event::Resize(_, rows) => {
            session.panel.viewport_resized(rows);
        }
        _ => {}
    }
}

fn handle_key(key: KeyEvent, session: &mut ConsoleSession, view: &mut ViewState, services: &Services) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        view.should_quit = true;
        return;
    }
    if view.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::F(1)) {
            view.show_help = false;
        }
        return;
    }

    match key.code {
        KeyCode::Esc if view.input.is_empty() => view.should_quit = true,
        KeyCode::Esc => view.input.clear(),
        KeyCode::F(1) => view.show_help = true,
        KeyCode::Char('?') if view.input.is_empty() => view.show_help = true,
        KeyCode::Char('n') if ctrl => run_command(ConsoleCommand::NewMatch, session, view, services),
        KeyCode::Tab => view.target = view.target.next(),
        KeyCode::F(2) => {
            view.chat_tab = match view.chat_tab {
                ChatTab::Copilot => ChatTab::Enemy,
                ChatTab::Enemy => ChatTab::Copilot,
            };
        }
        KeyCode::F(3) => view.debug_tab = view.debug_tab.next(),
        KeyCode::F(4) => match view.debug_tab {
            DebugTab::Log => {
                session.cycle_master_filter();
            }
            DebugTab::Enemy => {
                session.cycle_enemy_filter();
            }
            DebugTab::Strategy => {}
        },
        KeyCode::F(5) => run_command(ConsoleCommand::Clear(view.debug_tab), session, view, services),
        KeyCode::F(6) => run_command(ConsoleCommand::Enemy(ControlAction::Start), session, view, services),
        KeyCode::F(7) => run_command(ConsoleCommand::Enemy(ControlAction::Stop), session, view, services),
        KeyCode::F(8) => run_command(
            ConsoleCommand::Strategy(ControlAction::StrategyStart { command: None }),
            session,
            view,
            services,
        ),
        KeyCode::F(9) => run_command(
            ConsoleCommand::Strategy(ControlAction::StrategyStop),
            session,
            view,
            services,
        ),
        KeyCode::Enter => {
            let line = std::mem::take(&mut view.input);
            match parse_input(view.target, &line) {
                Ok(Some(command)) => run_command(command, session, view, services),
                Ok(None) => {}
                Err(message) => session.state.log(LogLevel::Warning, message),
            }
        }
        KeyCode::Backspace => {
            view.input.pop();
        }
        KeyCode::Char(ch) if !ctrl => view.input.push(ch),
        _ => {}
    }
}

fn run_command(
    command: ConsoleCommand,
    session: &mut ConsoleSession,
    view: &mut ViewState,
    services: &Services,
) {
    // Failures are already reflected in the logs and chat by the session.
    let result = match command {
        ConsoleCommand::Copilot(text) => session.send_command(&text),
        ConsoleCommand::EnemyChat(text) => session.send_enemy_message(&text),
        ConsoleCommand::StrategyCmd(text) => session.strategy_command(&text),
        ConsoleCommand::Service(action) => {
            session.note_service_action(action);
            spawn_action(services.client.clone(), action, services.events.clone());
            Ok(())
        }
        ConsoleCommand::RefreshStatus => {
            spawn_status(services.client.clone(), services.events.clone());
            Ok(())
        }
        ConsoleCommand::EnemyInterval(raw) => session.set_enemy_interval(&raw),
        ConsoleCommand::Enemy(action) => session.enemy_control(action),
        ConsoleCommand::Strategy(action) => session.strategy_control(action),
        ConsoleCommand::NewMatch => session.reset_all(),
        ConsoleCommand::Filter(filter) => {
            session.set_master_filter(filter);
            Ok(())
        }
        ConsoleCommand::Clear(tab) => {
            match tab {
                DebugTab::Log => session.clear_master_log(),
                DebugTab::Enemy => session.clear_enemy_debug(),
                DebugTab::Strategy => session.clear_strategy_log(),
            }
            Ok(())
        }
        ConsoleCommand::Help => {
            view.show_help = true;
            Ok(())
        }
        ConsoleCommand::Quit => {
            view.should_quit = true;
            Ok(())
        }
    };
    if let Err(err) = result {
        tracing::debug!(event = "console_command_rejected", error = %err);
    }
}

fn handle_mouse(mouse: MouseEvent, area: Rect, session: &mut ConsoleSession) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let regions = ui::layout_regions(area, session.panel.height());
            if regions.is_resizer_row(mouse.row) {
                session.panel.pointer_down(mouse.row);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            session.panel.pointer_move(mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            session.panel.pointer_up();
        }
        _ => {}
    }
}

fn init_logging(config: &Config) -> Option<LogGuard> {
    let level = if config.debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("SEED_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let guard = match open_log_file(&config.log_dir) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("log_file_error: {err:#}");
            LogGuard { file: None }
        }
    };
    let file = guard.file.clone();
    let stdout = env_true("SEED_LOG_STDOUT");
    let make_writer = BoxMakeWriter::new(move || MultiWriter::new(stdout, file.clone()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    Some(guard)
}

struct LogGuard {
    file: Option<Arc<Mutex<std::fs::File>>>,
}

/// The terminal belongs to the UI, so stdout is opt-in.
struct MultiWriter {
    stdout: Option<io::Stdout>,
    file: Option<Arc<Mutex<std::fs::File>>>,
}

impl MultiWriter {
    fn new(stdout: bool, file: Option<Arc<Mutex<std::fs::File>>>) -> Self {
        Self {
            stdout: stdout.then(io::stdout),
            file,
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(stdout) = &mut self.stdout {
            let _ = stdout.write_all(buf);
        }
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(stdout) = &mut self.stdout {
            let _ = stdout.flush();
        }
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = file.flush();
        }
        Ok(())
    }
}

fn open_log_file(log_dir: &Path) -> Result<LogGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;
    let path = log_dir.join("seed-console.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    Ok(LogGuard {
        file: Some(Arc::new(Mutex::new(file))),
    })
}

fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}
