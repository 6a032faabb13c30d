//! Logging for shellpilot sessions
//!
//! tracing output goes to a log file found through an XDG fallback chain so
//! it never interleaves with the REPL. Stderr is used only when no file can
//! be opened.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Explicit log file override
pub const LOG_FILE_ENV: &str = "SHELLPILOT_LOG_FILE";

/// Filter override (`debug`, `shellpilot_common=trace`, ...)
pub const LOG_FILTER_ENV: &str = "SHELLPILOT_LOG";

/// Discover log file path with fallback chain
///
/// Priority:
/// 1. $SHELLPILOT_LOG_FILE environment variable (explicit override)
/// 2. $XDG_STATE_HOME/shellpilot/shellpilot.log (XDG standard)
/// 3. ~/.local/state/shellpilot/shellpilot.log (XDG fallback)
pub fn discover_log_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(LOG_FILE_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    if let Some(state) = std::env::var_os("XDG_STATE_HOME").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(state).join("shellpilot").join("shellpilot.log"));
    }

    dirs::home_dir().map(|home| {
        home.join(".local")
            .join("state")
            .join("shellpilot")
            .join("shellpilot.log")
    })
}

/// Filter from `$SHELLPILOT_LOG`, else the configured level
pub fn build_filter(config_level: &str) -> EnvFilter {
    match std::env::var(LOG_FILTER_ENV) {
        Ok(directive) if !directive.trim().is_empty() => {
            EnvFilter::try_new(directive.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
        }
        _ => EnvFilter::try_new(config_level).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber; returns the log file in use, if any
pub fn init(config_level: &str) -> Option<PathBuf> {
    let filter = build_filter(config_level);

    let file = discover_log_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
        Some((path, file))
    });

    match file {
        Some((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .try_init();
            None
        }
    }
}
