//! Logging infrastructure for Vigil.
//!
//! Structured logging on top of the `tracing` ecosystem. The console keeps its
//! own JSON log file because the terminal belongs to the TUI while it runs.
//!
//! ## Features
//!
//! - JSON lines format for machine parsing
//! - File output to `~/.vigil/logs/vigil.log` (rolled daily)
//! - Optional console output, for commands that do not take over the terminal
//! - `-v` flag support for verbose logging
//!
//! ## Example
//!
//! ```no_run
//! use vigil_core::logging;
//!
//! let _guard = logging::init_logging(None, false, false).expect("logging init");
//!
//! tracing::info!("Vigil started");
//! tracing::debug!(url = "ws://localhost:8000/ws/alerts", "connecting");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{Result, VigilError};

/// Guard that must be held to ensure log flushing on shutdown.
///
/// When this guard is dropped, it flushes any pending log entries.
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the Vigil logging system.
///
/// This sets up:
/// - File logging to `<log_dir>/vigil.log` (JSON lines format)
/// - Console logging to stderr when `console` is true
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.vigil/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
/// * `console` - If true, also log human-readable lines to stderr.
///
/// `RUST_LOG` takes precedence over `verbose` when set.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool, console: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| VigilError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "vigil.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    // Writing to stderr while ratatui owns the alternate screen corrupts the display.
    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_file(verbose)
            .with_line_number(verbose)
            .compact()
            .boxed()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| VigilError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, console, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Default filter directive for the given verbosity.
fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("vigil={level}")
}

/// Root of Vigil's per-user state, `~/.vigil/`.
pub fn vigil_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".vigil"))
        .ok_or_else(|| VigilError::internal("home directory could not be determined"))
}

/// Get the default log directory path.
///
/// Returns `~/.vigil/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(vigil_home()?.join("logs"))
}

/// Get the default log file path.
///
/// Returns `~/.vigil/logs/vigil.log`
pub fn default_log_file() -> Result<PathBuf> {
    Ok(default_log_dir()?.join("vigil.log"))
}

/// Log a stream connection state change.
///
/// # Example
///
/// ```ignore
/// log_stream_event!("connected", url = %url);
/// log_stream_event!("closed", reason = "eof");
/// ```
#[macro_export]
macro_rules! log_stream_event {
    ($event:expr) => {
        tracing::info!(
            target: "vigil::stream",
            event = $event,
            "stream event"
        )
    };
    ($event:expr, $($field:tt)*) => {
        tracing::info!(
            target: "vigil::stream",
            event = $event,
            $($field)*,
            "stream event"
        )
    };
}

/// Log a REST request outcome.
///
/// # Example
///
/// ```ignore
/// log_api_call!("/api/get-stats", success = true);
/// log_api_call!("/api/block-ip", success = false, error = %err);
/// ```
#[macro_export]
macro_rules! log_api_call {
    ($endpoint:expr, $($field:tt)*) => {
        tracing::info!(
            target: "vigil::api",
            endpoint = $endpoint,
            $($field)*,
            "api call"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_log_dir() {
        // SAFETY: serialized with the other HOME-mutating tests
        unsafe { std::env::set_var("HOME", "/tmp/test-home") };
        let dir = default_log_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/test-home/.vigil/logs"));
    }

    #[test]
    #[serial]
    fn test_default_log_file() {
        // SAFETY: serialized with the other HOME-mutating tests
        unsafe { std::env::set_var("HOME", "/tmp/test-home") };
        let file = default_log_file().unwrap();
        assert_eq!(file, PathBuf::from("/tmp/test-home/.vigil/logs/vigil.log"));
    }

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "vigil=info");
        assert_eq!(default_filter(true), "vigil=debug");
    }
}
