//! CLI integration tests for shellpilot
//!
//! Drives the compiled binary with piped stdin. Every test points
//! SHELLPILOT_HOME and the log file at a temp dir and uses the local
//! ollama backend, so nothing touches the network or the real config.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run_with_input(home: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_shellpilot"))
        .args(args)
        .env("SHELLPILOT_HOME", home)
        .env("SHELLPILOT_LOG_FILE", home.join("shellpilot.log"))
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run shellpilot");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_exit_terminates_cleanly() {
    let home = TempDir::new().unwrap();
    let output = run_with_input(home.path(), &["--backend", "ollama"], "exit\n");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Terminating..."));
}

#[test]
fn test_eof_terminates_cleanly() {
    let home = TempDir::new().unwrap();
    let output = run_with_input(home.path(), &["--backend", "ollama"], "");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Terminating..."));
}

#[test]
fn test_help_and_direct_command() {
    let home = TempDir::new().unwrap();
    let output = run_with_input(
        home.path(),
        &["--backend", "ollama"],
        "help\n!echo shellpilot-direct\nquit\n",
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("shellpilot-direct"));

    // Direct commands land in the persisted history
    let history = std::fs::read_to_string(home.path().join("history.jsonl")).unwrap();
    assert!(history.contains("echo shellpilot-direct"));
}

#[test]
fn test_alias_persists_between_sessions() {
    let home = TempDir::new().unwrap();
    let output = run_with_input(
        home.path(),
        &["--backend", "ollama"],
        "alias add greet \"echo hello-from-alias\"\nexit\n",
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Alias 'greet' added"));

    let output = run_with_input(home.path(), &["--backend", "ollama"], "!greet\nexit\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Expanded to: echo hello-from-alias"));
    assert!(stdout.contains("hello-from-alias"));
}

#[test]
fn test_missing_credential_is_reported() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_shellpilot"))
        .args(["--backend", "groq"])
        .env("SHELLPILOT_HOME", home.path())
        .env("SHELLPILOT_LOG_FILE", home.path().join("shellpilot.log"))
        .env_remove("GROQ_API_KEY")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("GROQ_API_KEY"));
}

#[test]
fn test_config_init_writes_file() {
    let home = TempDir::new().unwrap();
    let output = run_with_input(home.path(), &["config", "--init"], "");

    assert!(output.status.success());
    assert!(home.path().join("config.toml").exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("backend = \"ollama\""));
}
