//! dirscope: a terminal directory browser built with ratatui.
//!
//! This binary loads the configuration, opens the start directory,
//! initialises the terminal, runs the navigator loop, and restores the
//! terminal on exit or panic.

mod input;
mod launcher;
mod render;
mod ui;

use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dirscope_core::config::{Config, Keymap};
use dirscope_core::fs::preview::TextPreviewer;
use dirscope_core::model::{DirectoryModel, ModelOptions};
use dirscope_core::nav::controller::{Navigator, ViewOptions};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use crate::input::TerminalInput;
use crate::launcher::SystemOpener;
use crate::render::render;

/// How long the loop waits for a key before draining background updates.
const TICK: Duration = Duration::from_millis(100);

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Installs a panic hook that restores the terminal before printing the panic.
fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Logs to a file so output never interferes with the terminal UI.
///
/// The level comes from `DIRSCOPE_LOG` (e.g. `debug`, `dirscope_core=trace`)
/// and defaults to `info`. Logging is skipped if the file cannot be opened.
fn init_logging() {
    let path = std::env::temp_dir().join("dirscope.log");
    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("dirscope: logging disabled, cannot open {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_env("DIRSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
}

/// `$DIRSCOPE_CONFIG`, else `~/.config/dirscope/config.toml`.
fn load_config() -> Config {
    let path = std::env::var_os("DIRSCOPE_CONFIG")
        .map(PathBuf::from)
        .or_else(Config::default_path);
    match path {
        Some(path) => Config::load_or_default(&path),
        None => Config::default(),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let start_dir = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => std::env::current_dir()?,
    };

    let config = load_config();
    let keymap = Keymap::with_overrides(&config.keys);
    let model = DirectoryModel::new(ModelOptions::from(&config));
    let mut nav = match Navigator::new(
        model,
        &start_dir,
        Box::new(TextPreviewer::new(config.preview.max_bytes)),
        Box::new(SystemOpener),
        ViewOptions::from(&config),
    ) {
        Ok(nav) => nav,
        Err(e) => {
            tracing::error!("cannot open {}: {e}", start_dir.display());
            eprintln!("dirscope: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("browsing {}", nav.state().current_path.display());

    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let mut input = TerminalInput::new(keymap);

    let result = nav.run(&mut input, TICK, |nav| {
        terminal.draw(|f| render(f, nav)).map(|_| ())
    });

    restore_terminal(&mut terminal)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
