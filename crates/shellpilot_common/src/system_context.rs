//! Host facts embedded in the role instructions

use std::collections::BTreeSet;
use std::path::Path;
use sysinfo::System;

/// How many installed command names are shown to the model
const MAX_INSTALLED_SAMPLE: usize = 75;

/// Facts about the machine the commands will run on
#[derive(Debug, Clone, Default)]
pub struct SystemContext {
    pub user: String,
    pub shell: String,
    pub os_family: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub installed: Vec<String>,
}

impl SystemContext {
    /// Collect facts from the environment and PATH
    pub fn detect() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let shell = std::env::var("SHELL")
            .or_else(|_| std::env::var("COMSPEC"))
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            user,
            shell,
            os_family: os_family().to_string(),
            os_name: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
            installed: installed_commands(std::env::var_os("PATH").as_deref()),
        }
    }

    /// One-line summary for banners
    pub fn summary(&self) -> String {
        format!("{} {} ({})", self.os_name, self.os_version, self.arch)
            .trim()
            .to_string()
    }

    /// Example commands matching the OS family
    pub fn os_examples(&self) -> &'static str {
        match self.os_family.as_str() {
            "windows" => "dir, where, tasklist, type, findstr",
            "macos" => "ls, which, ps, open, pbcopy, brew",
            _ => "ls, which, ps, cat, grep, find",
        }
    }
}

/// Normalised OS family: windows, macos or linux
pub fn os_family() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "macos",
        _ => "linux",
    }
}

/// Sorted sample of executable names found on PATH
fn installed_commands(path_var: Option<&std::ffi::OsStr>) -> Vec<String> {
    let Some(path_var) = path_var else {
        return Vec::new();
    };

    let mut names = BTreeSet::new();
    for dir in std::env::split_paths(path_var) {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if is_executable(&entry.path()) {
                if let Some(name) = entry.file_name().to_str() {
                    names.insert(name.to_string());
                }
            }
        }
    }
    names.into_iter().take(MAX_INSTALLED_SAMPLE).collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_has_basics() {
        let ctx = SystemContext::detect();
        assert!(!ctx.arch.is_empty());
        assert!(["windows", "macos", "linux"].contains(&ctx.os_family.as_str()));
        assert!(ctx.installed.len() <= MAX_INSTALLED_SAMPLE);
    }

    #[test]
    fn test_missing_path_has_no_commands() {
        assert!(installed_commands(None).is_empty());
    }

    #[test]
    fn test_os_examples() {
        let mut ctx = SystemContext::default();
        ctx.os_family = "windows".to_string();
        assert!(ctx.os_examples().contains("tasklist"));
        ctx.os_family = "linux".to_string();
        assert!(ctx.os_examples().contains("grep"));
    }
}
