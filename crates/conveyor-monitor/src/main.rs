mod theme;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use conveyor_core::ClientCommand;
use conveyor_monitor::config::{Args, MonitorConfig};
use conveyor_monitor::logging::init_logging;
use conveyor_monitor::{ConnectionManager, MonitorState, WsTransport};
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};
use tracing::{info, warn};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);
const SPEED_STEP_SECS: f64 = 0.25;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = MonitorConfig::from_env(args).context("invalid monitor configuration")?;
    let _log_guard = init_logging(&config.log);
    info!(
        "monitor_start: url={} reconnect={:?}",
        config.url, config.reconnect
    );

    let endpoint = config.url.to_string();
    let mut link = ConnectionManager::new(WsTransport::new(config.url), config.reconnect);
    let mut state = MonitorState::new();
    link.connect();

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut link, &mut state, &endpoint).await;
    let restored = restore_terminal(&mut terminal);
    link.shutdown(SHUTDOWN_GRACE).await;
    restored?;
    info!("monitor_exit");
    result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    link: &mut ConnectionManager<WsTransport>,
    state: &mut MonitorState,
    endpoint: &str,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        terminal.draw(|frame| ui::render(frame, state, endpoint))?;
        tokio::select! {
            event = link.next_event() => {
                state.apply_link_event(event);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if handle_key(key, link, state) {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("terminal input failed"),
                    None => break,
                }
            }
            _ = redraw.tick() => {}
        }
    }

    Ok(())
}

/// Returns true when the dashboard should exit.
fn handle_key(
    key: KeyEvent,
    link: &mut ConnectionManager<WsTransport>,
    state: &mut MonitorState,
) -> bool {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return false;
    }
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('s') => ClientCommand::StartSimulation,
        KeyCode::Char('x') => ClientCommand::StopSimulation,
        KeyCode::Char('r') => ClientCommand::ResetSystem,
        KeyCode::Char('+') | KeyCode::Char('=') => ClientCommand::UpdateSpeed {
            speed: state.stepped_speed(SPEED_STEP_SECS),
        },
        KeyCode::Char('-') => ClientCommand::UpdateSpeed {
            speed: state.stepped_speed(-SPEED_STEP_SECS),
        },
        _ => return false,
    };
    if let Err(err) = state.send_command(link, command) {
        warn!("command_failed: {err}");
    }
    false
}
