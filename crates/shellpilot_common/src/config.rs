//! Shellpilot Configuration
//!
//! Configuration lives in `<config_dir>/config.toml`. Every field has a
//! serde default so a partial (or missing) file still yields a usable
//! config.

use crate::error::ConfigError;
use crate::history::{DEFAULT_HISTORY_FILE_SIZE, DEFAULT_HISTORY_SIZE};
use crate::provider::{Backend, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Marker shown instead of a plaintext key
pub const REDACTED: &str = "********";

/// Provider selection and request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend identifier (ollama, openai, anthropic, ...)
    #[serde(default)]
    pub backend: Backend,

    /// Model name; backend default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout in seconds (valid: 5-600)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Override of the backend's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Plaintext API key (prefer api_key_env)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            base_url: None,
            api_key: None,
            api_key_env: None,
        }
    }
}

impl ProviderConfig {
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }

    pub fn effective_timeout(&self) -> u64 {
        self.timeout_secs.clamp(5, 600)
    }

    /// Resolve the API key
    ///
    /// Priority:
    /// 1. `api_key` in config.toml
    /// 2. the variable named by `api_key_env`
    /// 3. the backend's conventional variable (OPENAI_API_KEY, ...)
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }

        let env_names = self
            .api_key_env
            .iter()
            .map(String::as_str)
            .chain(self.backend.api_key_env());
        for name in env_names {
            if let Ok(value) = std::env::var(name) {
                if !value.trim().is_empty() {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Connection settings handed to `Provider::new`
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            backend: self.backend,
            model: self.effective_model(),
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.backend.default_base_url().to_string()),
            api_key: self.resolve_api_key(),
            timeout_secs: self.effective_timeout(),
        }
    }
}

/// Session sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Accepted commands kept in memory for prompts
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Entries kept in history.jsonl
    #[serde(default = "default_history_file_size")]
    pub history_file_size: usize,

    /// Messages kept in the conversation buffer
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

fn default_history_file_size() -> usize {
    DEFAULT_HISTORY_FILE_SIZE
}

fn default_conversation_limit() -> usize {
    20
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            history_file_size: default_history_file_size(),
            conversation_limit: default_conversation_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// tracing filter directive (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl Config {
    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Copy with the plaintext key hidden, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.provider.api_key.is_some() {
            copy.provider.api_key = Some(REDACTED.to_string());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.backend, Backend::Ollama);
        assert_eq!(config.provider.max_tokens, 8000);
        assert_eq!(config.session.history_size, DEFAULT_HISTORY_SIZE);
        assert_eq!(config.session.history_file_size, DEFAULT_HISTORY_FILE_SIZE);
        assert_eq!(config.session.conversation_limit, 20);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [provider]
            backend = "anthropic"
            model = "claude-test"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.backend, Backend::Anthropic);
        assert_eq!(config.provider.effective_model(), "claude-test");
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.session.history_size, 10);
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        assert!(Config::parse("[provider]\nbackend = \"watson\"\n").is_err());
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.provider.backend, Backend::Ollama);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.provider.backend = Backend::Groq;
        config.session.conversation_limit = 6;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.provider.backend, Backend::Groq);
        assert_eq!(loaded.session.conversation_limit, 6);
    }

    #[test]
    fn test_explicit_key_wins_and_is_redacted() {
        let mut config = Config::default();
        config.provider.backend = Backend::OpenAi;
        config.provider.api_key = Some("sk-secret".to_string());
        assert_eq!(config.provider.resolve_api_key().as_deref(), Some("sk-secret"));

        let shown = config.redacted().to_toml().unwrap();
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains(REDACTED));
    }

    #[test]
    fn test_key_from_named_env() {
        let mut config = ProviderConfig::default();
        config.backend = Backend::DeepSeek;
        config.api_key_env = Some("SHELLPILOT_TEST_KEY_FROM_ENV".to_string());
        std::env::set_var("SHELLPILOT_TEST_KEY_FROM_ENV", "ds-key");
        assert_eq!(config.resolve_api_key().as_deref(), Some("ds-key"));
        std::env::remove_var("SHELLPILOT_TEST_KEY_FROM_ENV");
    }

    #[test]
    fn test_timeout_clamped() {
        let mut config = ProviderConfig::default();
        config.timeout_secs = 1;
        assert_eq!(config.effective_timeout(), 5);
        config.timeout_secs = 10_000;
        assert_eq!(config.effective_timeout(), 600);
    }

    #[test]
    fn test_provider_settings_use_base_url_override() {
        let mut config = ProviderConfig::default();
        config.base_url = Some("http://gpu-box:11434".to_string());
        let settings = config.provider_settings();
        assert_eq!(settings.base_url, "http://gpu-box:11434");
        assert_eq!(settings.model, "llama3.2:3b");
    }
}
