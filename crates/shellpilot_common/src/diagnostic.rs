//! Diagnostic Loop - turns a failed command into a suggested fix
//!
//! The suggestion comes back as a fresh `DiagnosticSuggestion` proposal and
//! goes through the confirmation workflow like any other; it is never run
//! automatically and there is no retry limit beyond the user saying no.

use crate::error::ProviderError;
use crate::executor::ExecutionResult;
use crate::gateway::{ConversationBuffer, ProviderGateway, Role};
use crate::history::CommandHistory;
use crate::proposal::{CommandProposal, SourceRole};
use std::collections::BTreeMap;
use tracing::debug;

/// History entries included in the bundle
pub const DIAGNOSTIC_HISTORY: usize = 10;

/// Everything the error handler sees about a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticBundle {
    pub history: Vec<String>,
    pub current_dir: String,
    pub command: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl DiagnosticBundle {
    pub fn new(history: &CommandHistory, command: &str, result: &ExecutionResult) -> Self {
        Self {
            history: history
                .last(DIAGNOSTIC_HISTORY)
                .into_iter()
                .map(str::to_string)
                .collect(),
            current_dir: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            command: command.to_string(),
            stderr: result.stderr.trim_end().to_string(),
            exit_code: result.exit_code,
        }
    }

    /// Prompt text for the error handler role
    pub fn to_prompt(&self) -> String {
        format!(
            "Analyze the following failed command and its error output.\n\
             Explain briefly what went wrong and give ONE corrected command.\n\
             Command History (last {n} commands): {history}\n\
             Current Directory: {cwd}\n\
             Last Command: {command}\n\
             Error Output: {stderr}\n\
             Exit Code: {code}",
            n = DIAGNOSTIC_HISTORY,
            history = self.history.join(", "),
            cwd = self.current_dir,
            command = self.command,
            stderr = self.stderr,
            code = self.exit_code,
        )
    }
}

/// Error handler reply plus the proposal extracted from it
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub analysis: String,
    pub suggestion: Option<CommandProposal>,
}

/// Ask the error handler role about a failed command
pub fn diagnose(
    gateway: &ProviderGateway,
    conversation: &mut ConversationBuffer,
    bundle: &DiagnosticBundle,
) -> Result<Diagnosis, ProviderError> {
    let prompt = bundle.to_prompt();
    debug!(command = %bundle.command, exit_code = bundle.exit_code, "diagnosing failure");

    let reply = gateway.invoke(Role::ErrorHandler, &prompt, conversation, &BTreeMap::new())?;
    conversation.record(Role::ErrorHandler, &prompt, &reply);

    // Repeats are judged on marker-free text
    let suggestion = extract_suggestion(&reply)
        .map(|cmd| CommandProposal::from_model(&cmd, SourceRole::DiagnosticSuggestion))
        .filter(|proposal| proposal.command() != bundle.command.trim());

    Ok(Diagnosis {
        analysis: reply,
        suggestion,
    })
}

/// Pull the corrected command out of an error handler reply
///
/// Uses the `[Solution]:` line when present, otherwise the first line that
/// is not a section header. Backticks, code fences and `$ ` prompts are
/// removed.
pub fn extract_suggestion(reply: &str) -> Option<String> {
    let lines: Vec<&str> = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"))
        .collect();

    let solution = lines.iter().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        ["[solution]:", "solution:"]
            .iter()
            .find(|label| lower.starts_with(*label))
            .map(|label| line[label.len()..].trim())
    });

    let candidate = match solution {
        Some(s) => s,
        None => lines.iter().copied().find(|l| !l.starts_with('['))?,
    };

    let cleaned = candidate
        .trim_matches('`')
        .trim()
        .trim_start_matches("$ ")
        .trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
