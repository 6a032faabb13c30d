//! Shellpilot - natural language to shell commands, with a safety net
//!
//! Startup: parse flags, load config, initialise logging, build the
//! provider, then hand over to the REPL.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shellpilot::errors::{EXIT_CONFIG_ERROR, EXIT_GENERAL_ERROR, EXIT_PROVIDER_UNAVAILABLE, EXIT_SUCCESS};
use shellpilot::repl::{self, TERMINATING_MESSAGE};
use shellpilot::terminal::{self, SpinningGenerator};
use shellpilot::logging;
use shellpilot_common::alias::AliasTable;
use shellpilot_common::config::Config;
use shellpilot_common::executor::Executor;
use shellpilot_common::gateway::ProviderGateway;
use shellpilot_common::history::HistoryLog;
use shellpilot_common::paths;
use shellpilot_common::provider::{Backend, Provider};
use shellpilot_common::session::{Session, SessionLimits};
use shellpilot_common::system_context::SystemContext;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// Version is embedded at build time
const VERSION: &str = env!("SHELLPILOT_VERSION");

#[derive(Parser)]
#[command(name = "shellpilot")]
#[command(about = "Translate natural language into shell commands and run them safely", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Provider backend (ollama, openai, anthropic, google, groq, fireworks, openrouter, deepseek)
    #[arg(long)]
    backend: Option<String>,

    /// Model name for the selected backend
    #[arg(long)]
    model: Option<String>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration (API keys redacted)
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match paths::config_dir() {
        Ok(dir) => dir,
        Err(e) => {
            terminal::error(&format!("Error: {}", e));
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| paths::config_file(&config_dir));

    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            terminal::error(&format!("Error: {}", e));
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    if let Err(message) = apply_overrides(&mut config, cli.backend.as_deref(), cli.model.as_deref()) {
        terminal::error(&message);
        std::process::exit(EXIT_PROVIDER_UNAVAILABLE);
    }

    if let Some(Commands::Config { init }) = cli.command {
        return show_config(&config, &config_path, init);
    }

    let log_file = logging::init(&config.log.level);
    let session_span = tracing::info_span!("session", id = %Uuid::new_v4());
    let _guard = session_span.enter();
    info!(version = VERSION, log_file = ?log_file, "shellpilot starting");

    let provider = match Provider::new(config.provider.provider_settings()) {
        Ok(provider) => provider,
        Err(e) => {
            warn!(error = %e, "provider unavailable");
            terminal::error(&format!("Error: {}", e));
            std::process::exit(EXIT_PROVIDER_UNAVAILABLE);
        }
    };
    info!(backend = %provider.backend(), model = provider.model(), "provider ready");

    let gateway = ProviderGateway::new(
        Arc::new(SpinningGenerator::new(Arc::new(provider))),
        config.provider.max_tokens,
        SystemContext::detect(),
    );
    let limits = SessionLimits {
        history_size: config.session.history_size,
        conversation_limit: config.session.conversation_limit,
    };
    let mut session = Session::new(
        gateway,
        AliasTable::open(&paths::alias_file(&config_dir)),
        Box::new(Executor::new()),
        limits,
    )
    .with_history_log(HistoryLog::new(
        paths::history_file(&config_dir),
        config.session.history_file_size,
    ));

    let child_running = session.child_running();
    // Ctrl+C while a child runs belongs to the child
    if let Err(e) = ctrlc::set_handler(move || {
        if !child_running.load(Ordering::SeqCst) {
            println!();
            println!("{}", TERMINATING_MESSAGE);
            std::process::exit(EXIT_SUCCESS);
        }
    }) {
        warn!(error = %e, "failed to install Ctrl+C handler");
    }

    repl::print_banner(VERSION, &session);
    if let Err(e) = repl::run(&mut session) {
        warn!(error = %e, "terminal I/O failed");
        terminal::error(&format!("Error: {}", e));
        std::process::exit(EXIT_GENERAL_ERROR);
    }
    info!("shellpilot exiting");
    Ok(())
}

/// Apply `--backend` / `--model`; a new backend without a model uses its default
fn apply_overrides(config: &mut Config, backend: Option<&str>, model: Option<&str>) -> Result<(), String> {
    if let Some(name) = backend {
        let backend: Backend = name.parse().map_err(|e| format!("Error: {}", e))?;
        if backend != config.provider.backend {
            config.provider.backend = backend;
            config.provider.model = None;
            config.provider.base_url = None;
        }
    }
    if let Some(model) = model {
        config.provider.model = Some(model.to_string());
    }
    Ok(())
}

fn show_config(config: &Config, path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            Config::default().save(path)?;
            terminal::success(&format!("Wrote default config to {}", path.display()));
        }
    }

    terminal::header(&format!("Configuration ({})", path.display()));
    println!("{}", config.redacted().to_toml()?);
    println!("model = {}", config.provider.effective_model());
    let key_state = if !config.provider.backend.is_remote() {
        "not required"
    } else if config.provider.resolve_api_key().is_some() {
        "found"
    } else {
        "missing"
    };
    println!("api key = {}", key_state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_override_resets_model() {
        let mut config = Config::default();
        config.provider.model = Some("llama3".to_string());

        apply_overrides(&mut config, Some("groq"), None).unwrap();
        assert_eq!(config.provider.backend, Backend::Groq);
        assert_eq!(config.provider.model, None);

        apply_overrides(&mut config, None, Some("mixtral")).unwrap();
        assert_eq!(config.provider.model.as_deref(), Some("mixtral"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        let err = apply_overrides(&mut config, Some("watson"), None).unwrap_err();
        assert!(err.contains("watson"));
    }
}
