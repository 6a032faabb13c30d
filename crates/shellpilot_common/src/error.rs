//! Error types for shellpilot.
//!
//! Every per-command failure is recoverable: these errors are reported
//! inline and the session keeps reading input.

use thiserror::Error;

/// Alias table failures (validation and persistence)
#[derive(Error, Debug)]
pub enum AliasError {
    #[error("Invalid alias name '{0}': name must be alphanumeric with underscores")]
    InvalidName(String),

    #[error("Invalid command for alias '{name}': contains dangerous pattern '{pattern}'")]
    InvalidCommand { name: String, pattern: String },

    #[error("Duplicate alias name: '{0}' already exists")]
    Duplicate(String),

    #[error("Alias not found: '{0}'")]
    NotFound(String),

    #[error("Alias file '{path}' not found")]
    FileNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in alias file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors talking to the remote text-generation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Missing API key for {backend} (set {env_var} or add api_key to config.toml)")]
    MissingCredential { backend: String, env_var: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {backend}: {body}")]
    Http {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unsupported provider backend: '{0}'")]
    UnsupportedBackend(String),
}

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine configuration directory (set SHELLPILOT_HOME)")]
    NoConfigDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_messages() {
        let err = ProviderError::MissingCredential {
            backend: "openai".into(),
            env_var: "OPENAI_API_KEY".into(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert_eq!(
            ProviderError::UnsupportedBackend("foo".into()).to_string(),
            "Unsupported provider backend: 'foo'"
        );
    }
}
