//! pdvmon - quadrant dashboard for PDV terminals and their cameras
//!
//! # Usage
//!
//! ```text
//! pdvmon                          # config from the default location
//! pdvmon --config board.toml      # explicit config
//! pdvmon --server 10.0.0.1:8080   # override the backend address
//! pdvmon --slots 6                # override the slot count
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pdvmon_session::{spawn_session, SessionHandle, SlotBoard, Transports};
use pdvmon_tui::app::App;
use pdvmon_tui::config::DashboardConfig;
use pdvmon_tui::error::{Result as TuiResult, TuiError};
use pdvmon_tui::input::{dispatch, handle_key_event, Action, Event};
use pdvmon_tui::rtc::RtcPeerFactory;
use pdvmon_tui::ui;
use pdvmon_tui::ws::WsConnector;

// ============================================================================
// CLI Arguments
// ============================================================================

/// pdvmon - quadrant dashboard for PDV terminals and their cameras
#[derive(Parser, Debug)]
#[command(name = "pdvmon")]
#[command(about = "Watch PDV terminal events and camera feeds side by side")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/pdvmon/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Backend address, host[:port]
    #[arg(long, short = 's')]
    server: Option<String>,

    /// Number of slots on the board (1-9)
    #[arg(long)]
    slots: Option<u8>,
}

// ============================================================================
// Terminal Setup / Cleanup
// ============================================================================

fn setup_terminal() -> TuiResult<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| TuiError::TerminalInit(e.to_string()))?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| TuiError::TerminalInit(e.to_string()))
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> TuiResult<()> {
    disable_raw_mode().map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    terminal
        .show_cursor()
        .map_err(|e| TuiError::TerminalCleanup(e.to_string()))?;

    Ok(())
}

// ============================================================================
// Background Tasks
// ============================================================================

fn spawn_keyboard_task(
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if cancel_token.is_cancelled() {
                debug!("Keyboard task shutting down");
                break;
            }

            let poll_result = tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await;

            match poll_result {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if event_tx.send(Event::Key(key)).is_err() {
                        debug!("Event channel closed, keyboard task exiting");
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(width, height))) => {
                    if event_tx.send(Event::Resize(width, height)).is_err() {
                        break;
                    }
                }
                Ok(Some(_)) | Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Keyboard polling task panicked");
                    break;
                }
            }
        }
    })
}

/// Forwards session change notifications so the board redraws promptly.
fn spawn_session_watcher(
    handle: &SessionHandle,
    event_tx: mpsc::UnboundedSender<Event>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                received = events.recv() => match received {
                    Ok(_) => {
                        if event_tx.send(Event::SessionChanged).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Session watcher lagged");
                        if event_tx.send(Event::SessionChanged).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("Session events closed");
                        break;
                    }
                },
            }
        }
    })
}

// ============================================================================
// Main Event Loop
// ============================================================================

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    handle: &SessionHandle,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = tokio::time::timeout(tick_rate, event_rx.recv()).await;

        match event {
            Ok(Some(Event::Key(key))) => {
                let action = handle_key_event(key, app);
                match action {
                    Action::Quit => {
                        info!("User requested quit");
                        cancel_token.cancel();
                        break;
                    }
                    Action::None => {}
                    action => {
                        app.notice = None;
                        if let Err(e) = dispatch(action, handle).await {
                            warn!(error = %e, ?action, "Command rejected");
                            app.notice = Some(e.to_string());
                        }
                        app.refresh(handle.snapshot().await.ok());
                    }
                }
            }
            Ok(Some(Event::Resize(_width, _height))) => {
                debug!("Terminal resized");
            }
            Ok(Some(Event::SessionChanged)) => {
                app.refresh(handle.snapshot().await.ok());
            }
            Ok(None) => {
                warn!("Event channel closed");
                break;
            }
            Err(_) => app.refresh(None),
        }

        if app.should_quit || cancel_token.is_cancelled() {
            cancel_token.cancel();
            break;
        }
    }

    Ok(())
}

// ============================================================================
// Logging Setup
// ============================================================================

fn get_log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("pdvmon"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/pdvmon"))
}

fn create_log_file() -> Option<std::fs::File> {
    let log_dir = get_log_dir()?;

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
        return None;
    }

    let log_path = log_dir.join("pdvmon.log");

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Warning: Failed to open log file {log_path:?}: {e}");
            None
        }
    }
}

fn init_logging() {
    if let Some(file) = create_log_file() {
        let filter = EnvFilter::from_default_env().add_directive(
            "pdvmon=info"
                .parse()
                .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO)),
        );

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = DashboardConfig::discover(args.config.as_deref())?;
    if let Some(server) = args.server {
        config.server_address = Some(server);
    }
    if let Some(slots) = args.slots {
        config.slot_count = slots;
    }
    let layout = config.layout()?;

    info!(slots = layout.count(), "pdvmon starting...");

    let board = SlotBoard::new(layout);
    config.apply_inputs(&board, layout);

    let session_config = config.session_config(layout);
    let app_quality = session_config.default_quality.unwrap_or_default();
    let transports = Transports {
        connector: Arc::new(WsConnector::new(config.connect_timeout())),
        peers: Arc::new(RtcPeerFactory::new(config.ice_servers.clone())?),
    };
    let mut app = App::new(layout, board.clone())
        .with_quality(app_quality, &session_config.slot_quality);
    let handle = spawn_session(session_config, board, transports);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let cancel_token = CancellationToken::new();

    let mut terminal = match setup_terminal() {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to initialize terminal");
            return Err(e.into());
        }
    };

    let watcher_handle = spawn_session_watcher(&handle, event_tx.clone(), cancel_token.clone());
    let keyboard_handle = spawn_keyboard_task(event_tx, cancel_token.clone());

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx, &handle, &cancel_token).await;

    cancel_token.cancel();

    if handle.is_connected().await {
        if let Err(e) = handle.disconnect_server().await {
            warn!(error = %e, "Disconnect on exit failed");
        }
    }
    drop(handle);

    let _ = tokio::time::timeout(Duration::from_millis(100), watcher_handle).await;
    let _ = tokio::time::timeout(Duration::from_millis(100), keyboard_handle).await;

    if let Err(e) = cleanup_terminal(&mut terminal) {
        error!(error = %e, "Failed to cleanup terminal");
    }

    info!("pdvmon stopped");

    result
}
