//! SmartContact TUI - a terminal client for the SmartContact API.
//!
//! Sign in, register and recover your account from the terminal. The session
//! survives restarts through the configured storage backend.

mod app;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartcontact_core::auth::{FileStorage, KeyringStorage, SessionStorage, SessionStore};
use smartcontact_core::config::StorageBackend;
use smartcontact_core::{ApiClient, ApiSettings, Config, SessionManager};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "smartcontact.log";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a file in the data
/// directory. Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

fn session_storage(config: &Config, data_dir: &Path) -> Arc<dyn SessionStorage> {
    match config.storage {
        StorageBackend::File => Arc::new(FileStorage::new(data_dir)),
        StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config_path = Config::path().ok();
    let config = match config_path.as_deref() {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            eprintln!("Warning: ignoring unreadable config: {}", e);
            Config::default()
        }),
        None => Config::default(),
    };
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let _log_guard = init_tracing(&data_dir);
    info!(storage = ?config.storage, "SmartContact TUI starting");

    let settings = ApiSettings::from_env();
    let store = SessionStore::new(session_storage(&config, &data_dir));
    let api = ApiClient::new(&settings, store.clone())?;
    let mut session = SessionManager::new(store, api);
    session.initialize();

    let mut app = App::new(config, config_path, session, settings.base_url.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        warn!(error = %e, "Exited with error");
        eprintln!("Error: {}", e);
    }

    info!("SmartContact TUI shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.expire_toast(Instant::now());

        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll with a timeout so notifications expire without input
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await {
                    return Ok(());
                }
            }
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
