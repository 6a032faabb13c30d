//! Executor - runs confirmed commands
//!
//! Three paths:
//! - `cd` changes this process's working directory (a child cannot)
//! - interactive programs inherit the terminal; only the exit code is known
//! - everything else runs through the shell with stdout/stderr captured
//!
//! Spawn failures never escape: they become exit code 1 with the error text
//! as stderr.

use crate::paths::expand_tilde;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{info, warn};

/// Programs that manage the terminal themselves (matched on the first token)
pub const INTERACTIVE_PROGRAMS: &[&str] = &[
    "vim", "vi", "nano", "emacs", "ssh", "telnet", "top", "htop", "man", "less", "more",
    "mysql", "psql", "nmtui", "crontab", "passwd", "sudo", "su", "gdb", "screen", "tmux",
    "picocom", "powershell", "cmd", "ftp", "sftp", "taskmgr", "notepad", "regedit",
];

/// Shell operators that make a `cd` line a compound command
const SHELL_OPERATORS: &[&str] = &["&&", "||", ";", "|", "`", "$("];

/// How a command was run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Batch,
    Interactive,
    ChangeDirectory,
}

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub mode: ExecutionMode,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Whether a failure should go to the diagnostic loop
    pub fn needs_diagnosis(&self) -> bool {
        self.mode == ExecutionMode::Batch && !self.success()
    }

    fn spawn_failure(mode: ExecutionMode, error: impl ToString) -> Self {
        Self {
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: 1,
            mode,
        }
    }
}

/// Anything that can run a confirmed command
pub trait CommandRunner {
    fn run(&mut self, command: &str) -> ExecutionResult;
}

/// First token of a command, without any directory part
fn program_name(command: &str) -> &str {
    let first = command.split_whitespace().next().unwrap_or("");
    Path::new(first)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(first)
}

/// Whether the command starts an interactive program
pub fn is_interactive(command: &str) -> bool {
    let program = program_name(command);
    let program = program.strip_suffix(".exe").unwrap_or(program);
    INTERACTIVE_PROGRAMS.contains(&program)
}

/// Target of a plain `cd` line; `None` for anything else
///
/// `cd` alone means the home directory; `cd..` is read as `cd ..`.
/// Compound lines (`cd x && make`) are left to the shell.
pub fn change_directory_target(command: &str) -> Option<String> {
    let trimmed = command.trim();
    if trimmed == "cd.." {
        return Some("..".to_string());
    }
    if trimmed == "cd" {
        return Some("~".to_string());
    }
    let rest = trimmed.strip_prefix("cd ")?.trim();
    if SHELL_OPERATORS.iter().any(|op| rest.contains(op)) {
        return None;
    }
    let unquoted = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(rest);
    Some(unquoted.to_string())
}

/// Real executor backed by the system shell
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }

    fn change_directory(target: &str) -> ExecutionResult {
        let path = expand_tilde(target);
        match std::env::set_current_dir(&path) {
            Ok(()) => {
                let cwd = std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| path.display().to_string());
                info!(cwd = %cwd, "changed directory");
                ExecutionResult {
                    stdout: format!("Changed directory to {}", cwd),
                    stderr: String::new(),
                    exit_code: 0,
                    mode: ExecutionMode::ChangeDirectory,
                }
            }
            Err(e) => ExecutionResult::spawn_failure(
                ExecutionMode::ChangeDirectory,
                format!("cd: {}: {}", target, e),
            ),
        }
    }

    fn run_interactive(command: &str) -> ExecutionResult {
        let status = Self::shell_command(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();

        match status {
            Ok(status) => ExecutionResult {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: status.code().unwrap_or(-1),
                mode: ExecutionMode::Interactive,
            },
            Err(e) => {
                warn!(command, error = %e, "interactive spawn failed");
                ExecutionResult::spawn_failure(ExecutionMode::Interactive, e)
            }
        }
    }

    fn run_batch(command: &str) -> ExecutionResult {
        match Self::shell_command(command).stdin(Stdio::inherit()).output() {
            Ok(output) => ExecutionResult {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                mode: ExecutionMode::Batch,
            },
            Err(e) => {
                warn!(command, error = %e, "spawn failed");
                ExecutionResult::spawn_failure(ExecutionMode::Batch, e)
            }
        }
    }
}

impl CommandRunner for Executor {
    fn run(&mut self, command: &str) -> ExecutionResult {
        let start = Instant::now();

        let result = if let Some(target) = change_directory_target(command) {
            Self::change_directory(&target)
        } else if is_interactive(command) {
            Self::run_interactive(command)
        } else {
            Self::run_batch(command)
        };

        info!(
            command,
            exit_code = result.exit_code,
            mode = ?result.mode,
            duration_ms = start.elapsed().as_millis() as u64,
            "command executed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_detection_by_leading_token() {
        assert!(is_interactive("vim notes.txt"));
        assert!(is_interactive("sudo apt update"));
        assert!(is_interactive("/usr/bin/htop"));
        assert!(is_interactive("  ssh user@host"));
        assert!(!is_interactive("lsof -i :80"));
        assert!(!is_interactive("manpath"));
        assert!(!is_interactive("echo vim"));
        assert!(!is_interactive(""));
    }

    #[test]
    fn test_cd_targets() {
        assert_eq!(change_directory_target("cd /tmp").as_deref(), Some("/tmp"));
        assert_eq!(change_directory_target("cd..").as_deref(), Some(".."));
        assert_eq!(change_directory_target("cd").as_deref(), Some("~"));
        assert_eq!(change_directory_target("cd \"My Docs\"").as_deref(), Some("My Docs"));
        assert_eq!(change_directory_target("cd build && make"), None);
        assert_eq!(change_directory_target("cdrecord -v"), None);
        assert_eq!(change_directory_target("echo cd /tmp"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_batch_captures_streams() {
        let mut exec = Executor::new();
        let result = exec.run("echo out; echo err 1>&2; exit 3");
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.mode, ExecutionMode::Batch);
        assert!(result.needs_diagnosis());
    }

    #[cfg(unix)]
    #[test]
    fn test_batch_success() {
        let mut exec = Executor::new();
        let result = exec.run("printf hello");
        assert_eq!(result.stdout, "hello");
        assert!(result.success());
        assert!(!result.needs_diagnosis());
    }

    #[test]
    fn test_cd_failure_is_exit_one() {
        let mut exec = Executor::new();
        let result = exec.run("cd /definitely/not/a/real/dir/shellpilot");
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.starts_with("cd: "));
        assert_eq!(result.mode, ExecutionMode::ChangeDirectory);
        assert!(!result.needs_diagnosis());
    }
}
