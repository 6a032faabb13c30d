//! Path helpers for shellpilot
//!
//! Config, alias and history files live together in one directory so a
//! single `SHELLPILOT_HOME` override isolates a whole session (tests rely on
//! this).

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const HOME_ENV: &str = "SHELLPILOT_HOME";

const CONFIG_FILE: &str = "config.toml";
const ALIAS_FILE: &str = "aliases.json";
const HISTORY_FILE: &str = "history.jsonl";

/// Get the configuration directory
///
/// Priority:
/// 1. $SHELLPILOT_HOME (explicit override)
/// 2. $XDG_CONFIG_HOME/shellpilot (via `dirs`)
/// 3. ~/.config/shellpilot
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join("shellpilot"));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join("shellpilot"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Path of config.toml inside a config directory
pub fn config_file(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Path of the alias document inside a config directory
pub fn alias_file(dir: &Path) -> PathBuf {
    dir.join(ALIAS_FILE)
}

/// Path of the history log inside a config directory
pub fn history_file(dir: &Path) -> PathBuf {
    dir.join(HISTORY_FILE)
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_share_directory() {
        let dir = Path::new("/tmp/sp");
        assert_eq!(config_file(dir), PathBuf::from("/tmp/sp/config.toml"));
        assert_eq!(alias_file(dir), PathBuf::from("/tmp/sp/aliases.json"));
        assert_eq!(history_file(dir), PathBuf::from("/tmp/sp/history.jsonl"));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_tilde("relative/x"), PathBuf::from("relative/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/a.json"), home.join("a.json"));
        }
    }
}
