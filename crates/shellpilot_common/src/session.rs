//! Session - one user's command-safety pipeline
//!
//! Owns every piece of mutable state (aliases, history, conversation) and
//! processes one request completely before the next is read:
//! proposal -> confirmation -> execution -> diagnosis -> next proposal.

use crate::alias::AliasTable;
use crate::data_gatherer;
use crate::diagnostic::{self, DiagnosticBundle};
use crate::error::ProviderError;
use crate::executor::{CommandRunner, ExecutionMode, ExecutionResult};
use crate::gateway::{ConversationBuffer, ProviderGateway, Role};
use crate::history::{CommandHistory, HistoryLog, HistoryRecord};
use crate::proposal::{CommandProposal, SourceRole};
use crate::risk::refusal_reason;
use crate::system_context::os_family;
use crate::workflow::{ConfirmationWorkflow, Decision, Prompter};
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// A command that actually ran
#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    pub command: String,
    pub source_role: SourceRole,
    pub result: ExecutionResult,
}

/// How a request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    /// Last command ran (successfully or with no usable fix)
    Finished,
    /// User declined at a confirmation prompt
    Cancelled(String),
    /// Re-typed command did not match
    MismatchAborted(String),
    /// Model refused to produce a command
    Refused(String),
    /// Talking to the provider failed
    ProviderFailed(String),
}

/// Result of processing one request
#[derive(Debug, Clone)]
pub struct Outcome {
    pub executed: Vec<ExecutedCommand>,
    pub ending: Ending,
}

impl Outcome {
    fn ended(ending: Ending) -> Self {
        Self {
            executed: Vec::new(),
            ending,
        }
    }

    /// Exit code of the last executed command
    pub fn last_exit_code(&self) -> Option<i32> {
        self.executed.last().map(|e| e.result.exit_code)
    }

    /// Text to show for non-finished endings
    pub fn message(&self) -> Option<&str> {
        match &self.ending {
            Ending::Finished => None,
            Ending::Cancelled(m) | Ending::MismatchAborted(m) => Some(m),
            Ending::Refused(m) | Ending::ProviderFailed(m) => Some(m),
        }
    }
}

/// Sizes for the session-owned buffers
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub history_size: usize,
    pub conversation_limit: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            history_size: crate::history::DEFAULT_HISTORY_SIZE,
            conversation_limit: 20,
        }
    }
}

/// The pipeline and its state
pub struct Session {
    gateway: ProviderGateway,
    aliases: AliasTable,
    history: CommandHistory,
    history_log: Option<HistoryLog>,
    conversation: ConversationBuffer,
    runner: Box<dyn CommandRunner>,
    child_running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(
        gateway: ProviderGateway,
        aliases: AliasTable,
        runner: Box<dyn CommandRunner>,
        limits: SessionLimits,
    ) -> Self {
        Self {
            gateway,
            aliases,
            history: CommandHistory::new(limits.history_size),
            history_log: None,
            conversation: ConversationBuffer::new(limits.conversation_limit),
            runner,
            child_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised only while a confirmed command is running
    ///
    /// An interrupt handler uses it to leave Ctrl+C to the child.
    pub fn child_running(&self) -> Arc<AtomicBool> {
        self.child_running.clone()
    }

    /// Share an existing flag instead of the session's own
    pub fn with_child_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.child_running = flag;
        self
    }

    /// Persist every executed command to a history log
    pub fn with_history_log(mut self, log: HistoryLog) -> Self {
        self.history_log = Some(log);
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn conversation(&self) -> &ConversationBuffer {
        &self.conversation
    }

    pub fn gateway(&self) -> &ProviderGateway {
        &self.gateway
    }

    /// Persisted history, oldest first
    pub fn persisted_history(&self, n: usize) -> io::Result<Vec<HistoryRecord>> {
        match &self.history_log {
            Some(log) => log.last(n),
            None => Ok(Vec::new()),
        }
    }

    /// Natural language request: translate, confirm, execute
    pub fn handle_request(&mut self, input: &str, prompter: &mut dyn Prompter) -> io::Result<Outcome> {
        let additional = data_gatherer::gather(input);
        let prompt = format!(
            "User Input: {input}\n\
             Current OS: {os}\n\
             Current OS specific examples: {examples}\n\
             Translate the user input into a SINGLE shell command for this operating system.\n\
             Return ONLY the command, nothing else.\n\
             If the input is already a valid shell command, return it as is.\n\
             Use the actual filenames and content provided in the additional data.",
            input = input.trim(),
            os = os_family(),
            examples = self.gateway.system().os_examples(),
        );

        let reply = match self
            .gateway
            .invoke(Role::CommandExecutor, &prompt, &self.conversation, &additional)
        {
            Ok(reply) => reply,
            Err(e) => return Ok(Outcome::ended(provider_failed(&e))),
        };
        self.conversation.record(Role::CommandExecutor, input, &reply);

        if let Some(reason) = refusal_reason(&reply) {
            warn!(%reason, "model refused request");
            return Ok(Outcome::ended(Ending::Refused(format!("Refused: {}", reason))));
        }

        let proposal = CommandProposal::from_model(strip_fences(&reply), SourceRole::Translated);
        if proposal.command().is_empty() {
            return Ok(Outcome::ended(Ending::Refused(
                "The model did not return a command.".to_string(),
            )));
        }

        self.process(proposal, input, prompter)
    }

    /// `!` input: alias expansion, no translation, no confirmation
    pub fn handle_direct(&mut self, input: &str, prompter: &mut dyn Prompter) -> io::Result<Outcome> {
        let expansion = self.aliases.expand(input.trim());
        if expansion.used_alias {
            prompter.notify(&format!("Expanded to: {}", expansion.resolved));
        }
        let proposal = CommandProposal::direct(&expansion.resolved, expansion.used_alias);
        if proposal.command().is_empty() {
            return Ok(Outcome::ended(Ending::Cancelled(
                "Please provide a command after '!'.".to_string(),
            )));
        }
        self.process(proposal, input, prompter)
    }

    /// `?` input: answer with the question role
    pub fn answer_question(&mut self, question: &str) -> Result<String, ProviderError> {
        let question = question.trim().trim_matches('?').trim();
        let prompt = format!(
            "Question: {}\n\
             Command History (last {} commands): {}\n\
             Please provide a clear and concise answer, taking the context into account.",
            question,
            self.history.capacity(),
            self.history.iter().collect::<Vec<_>>().join(", "),
        );
        let answer = self
            .gateway
            .invoke(Role::QuestionAnswerer, &prompt, &self.conversation, &BTreeMap::new())?;
        self.conversation.record(Role::QuestionAnswerer, question, &answer);
        Ok(answer)
    }

    /// `debug` input: environment diagnosis with the debugger role
    pub fn debug_problem(&mut self, problem: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Problem: {}\nRecent commands: {}",
            problem.trim(),
            self.history.iter().collect::<Vec<_>>().join(", "),
        );
        let analysis = self
            .gateway
            .invoke(Role::Debugger, &prompt, &self.conversation, &BTreeMap::new())?;
        self.conversation.record(Role::Debugger, problem, &analysis);
        Ok(analysis)
    }

    /// Drive a proposal (and any diagnostic follow-ups) to an ending
    pub fn process(
        &mut self,
        proposal: CommandProposal,
        natural_language: &str,
        prompter: &mut dyn Prompter,
    ) -> io::Result<Outcome> {
        let mut executed = Vec::new();
        let mut proposal = proposal;

        loop {
            let decision = ConfirmationWorkflow::new(&proposal).run(prompter)?;
            let command = match decision {
                Decision::Execute(command) => command,
                Decision::Cancelled(message) => {
                    return Ok(Outcome {
                        executed,
                        ending: Ending::Cancelled(message),
                    })
                }
                Decision::MismatchAborted(message) => {
                    info!(command = proposal.command(), "retype mismatch, execution refused");
                    return Ok(Outcome {
                        executed,
                        ending: Ending::MismatchAborted(message),
                    });
                }
            };

            prompter.notify(&format!("Command: {}", command));
            self.remember(natural_language, &command);
            info!(
                command = %command,
                source = proposal.source_role().as_str(),
                risk = proposal.risk_tag().as_str(),
                "executing command"
            );
            self.child_running.store(true, Ordering::SeqCst);
            let result = self.runner.run(&command);
            self.child_running.store(false, Ordering::SeqCst);
            self.report(&result, prompter);

            let needs_diagnosis = result.needs_diagnosis();
            let bundle = needs_diagnosis.then(|| DiagnosticBundle::new(&self.history, &command, &result));
            executed.push(ExecutedCommand {
                command,
                source_role: proposal.source_role(),
                result,
            });

            let Some(bundle) = bundle else {
                return Ok(Outcome {
                    executed,
                    ending: Ending::Finished,
                });
            };

            match diagnostic::diagnose(&self.gateway, &mut self.conversation, &bundle) {
                Ok(diagnosis) => {
                    prompter.warn(&format!("Debugging Suggestion:\n{}", diagnosis.analysis));
                    match diagnosis.suggestion {
                        Some(next) => proposal = next,
                        None => {
                            return Ok(Outcome {
                                executed,
                                ending: Ending::Finished,
                            })
                        }
                    }
                }
                Err(e) => {
                    return Ok(Outcome {
                        executed,
                        ending: provider_failed(&e),
                    })
                }
            }
        }
    }

    fn remember(&mut self, natural_language: &str, command: &str) {
        self.history.push(command);
        if let Some(log) = &self.history_log {
            if let Err(e) = log.append(natural_language.trim(), command) {
                warn!(error = %e, "failed to write history log");
            }
        }
    }

    fn report(&self, result: &ExecutionResult, prompter: &mut dyn Prompter) {
        if !result.stdout.trim().is_empty() {
            prompter.show_output(result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            prompter.show_error(&format!("Error: {}", result.stderr.trim_end()));
        }
        if result.mode == ExecutionMode::Interactive && !result.success() {
            prompter.warn(&format!("Command exited with code {}", result.exit_code));
        }
    }
}

fn provider_failed(error: &ProviderError) -> Ending {
    warn!(error = %error, "provider call failed");
    Ending::ProviderFailed(format!("Error in processing: {}", error))
}

/// Drop a surrounding Markdown code fence from a model reply
fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.trim_matches('`').trim();
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Skip a language tag on the opening fence line
    match inner.split_once('\n') {
        Some((first, rest)) if !first.trim().contains(' ') && !rest.trim().is_empty() => rest.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("ls -la"), "ls -la");
        assert_eq!(strip_fences("`ls -la`"), "ls -la");
        assert_eq!(strip_fences("```bash\nls -la\n```"), "ls -la");
        assert_eq!(strip_fences("```\nCONFIRM:rm x\n```"), "CONFIRM:rm x");
    }

    #[test]
    fn test_outcome_message() {
        let outcome = Outcome::ended(Ending::Refused("Refused: no".into()));
        assert_eq!(outcome.message(), Some("Refused: no"));
        assert_eq!(outcome.last_exit_code(), None);
        assert_eq!(Outcome::ended(Ending::Finished).message(), None);
    }
}
