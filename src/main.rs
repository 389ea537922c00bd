//! Vigil - Suricata IDS/IPS monitoring console
//!
//! A terminal console for the Vigil dashboard backend: live alerts,
//! rules, reports and IP blocking.
//!
//! ## Usage
//!
//! ```bash
//! # Start the console against the configured backend
//! vigil
//!
//! # Point at another backend
//! vigil --api-url http://ids.internal:8080
//!
//! # With verbose logging and a custom log directory
//! vigil -v --log-dir /path/to/logs/
//! ```

use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use vigil_config::ConsoleConfig;
use vigil_core::{LogGuard, VigilError, init_logging};
use vigil_tui::App;

/// Vigil IDS console
///
/// Watches a Suricata IDS/IPS through the Vigil dashboard backend.
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.vigil/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.vigil/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long)]
    api_url: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            report_error(&e);
            return ExitCode::from(1);
        }
    };

    install_panic_hook();

    info!(api_url = %config.api_url, "starting Vigil console");

    match run_app(config) {
        Ok(()) => {
            info!("Vigil console exited normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Vigil console error: {}", e);
            match e.downcast_ref::<VigilError>() {
                Some(vigil_err) => report_error(vigil_err),
                None => eprintln!("Error: {}", e),
            }
            ExitCode::from(1)
        }
    }
}

/// Print an error, its cause and any guidance to stderr.
fn report_error(e: &VigilError) {
    if e.is_config_error() {
        eprintln!("Configuration error: {}", e);
    } else {
        eprintln!("Error: {}", e);
    }
    if let Some(source) = std::error::Error::source(e) {
        eprintln!("  caused by: {}", source);
    }
    if let Some(guidance) = e.guidance() {
        eprintln!("\n{}", guidance);
    }
}

/// Install a panic hook that restores the terminal before printing the panic message.
fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));
}

/// Restore terminal to its normal state.
fn restore_terminal() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();

    let _ = crossterm::terminal::disable_raw_mode();
    crossterm::execute!(
        stdout,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    stdout.flush()?;

    Ok(())
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> vigil_core::Result<LogGuard> {
    // The TUI owns the terminal, so logs only go to files.
    init_logging(cli.log_dir.clone(), cli.verbose > 0, false)
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<ConsoleConfig, VigilError> {
    let mut config = ConsoleConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

/// Run the TUI application.
fn run_app(config: ConsoleConfig) -> vigil_tui::AppResult<()> {
    let mut app = App::new(config);
    app.run()
}
