//! Confirmation Workflow - tiered human approval before execution
//!
//! Proposed -> AwaitingConfirm -> Cancelled
//!                             -> Executing                      (confirm tier)
//!                             -> AwaitingDestructiveConfirm -> Cancelled
//!                                -> AwaitingRetype -> Verified -> Executing
//!                                                  -> MismatchAborted
//!
//! Normal proposals go from Proposed straight to Executing. Terminal states
//! carry a message and have no side effects; the workflow never retries.

use crate::proposal::{CommandProposal, SourceRole};
use crate::risk::RiskTag;
use std::collections::VecDeque;
use std::io;

pub const CANCELLED_MESSAGE: &str = "Command cancelled!";
pub const ABORTED_MESSAGE: &str = "Command execution aborted.";
pub const MISMATCH_MESSAGE: &str = "Command mismatch. Verification failed, execution aborted.";

/// User interaction needed by the workflow
pub trait Prompter {
    /// Yes/no question
    fn confirm(&mut self, question: &str) -> io::Result<bool>;

    /// Free text answer
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Informational line (proposal display, warnings)
    fn notify(&mut self, message: &str);

    /// Warning line; defaults to a plain notice
    fn warn(&mut self, message: &str) {
        self.notify(message);
    }

    /// Captured stdout of a finished command
    fn show_output(&mut self, text: &str) {
        self.notify(text);
    }

    /// Captured stderr of a finished command
    fn show_error(&mut self, text: &str) {
        self.warn(text);
    }
}

/// Workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Proposed,
    AwaitingConfirm,
    AwaitingDestructiveConfirm,
    AwaitingRetype,
    Verified,
    Executing,
    Cancelled,
    MismatchAborted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Executing | WorkflowState::Cancelled | WorkflowState::MismatchAborted
        )
    }
}

/// Where the workflow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Hand this exact (marker-free) command to the executor
    Execute(String),
    Cancelled(String),
    MismatchAborted(String),
}

impl Decision {
    pub fn is_execute(&self) -> bool {
        matches!(self, Decision::Execute(_))
    }

    /// Message for non-executing outcomes
    pub fn message(&self) -> Option<&str> {
        match self {
            Decision::Execute(_) => None,
            Decision::Cancelled(m) | Decision::MismatchAborted(m) => Some(m),
        }
    }
}

/// Drives one proposal through the states
#[derive(Debug)]
pub struct ConfirmationWorkflow<'a> {
    proposal: &'a CommandProposal,
    state: WorkflowState,
    trail: Vec<WorkflowState>,
}

impl<'a> ConfirmationWorkflow<'a> {
    pub fn new(proposal: &'a CommandProposal) -> Self {
        Self {
            proposal,
            state: WorkflowState::Proposed,
            trail: vec![WorkflowState::Proposed],
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Every state visited, in order
    pub fn trail(&self) -> &[WorkflowState] {
        &self.trail
    }

    /// Run to a terminal state
    pub fn run(&mut self, prompter: &mut dyn Prompter) -> io::Result<Decision> {
        let mut outcome = None;
        while !self.state.is_terminal() {
            let next = self.step(prompter, &mut outcome)?;
            self.state = next;
            self.trail.push(next);
        }

        Ok(match self.state {
            WorkflowState::Executing => Decision::Execute(self.proposal.command().to_string()),
            WorkflowState::MismatchAborted => {
                Decision::MismatchAborted(MISMATCH_MESSAGE.to_string())
            }
            _ => Decision::Cancelled(outcome.unwrap_or(CANCELLED_MESSAGE).to_string()),
        })
    }

    fn step(
        &self,
        prompter: &mut dyn Prompter,
        cancel_message: &mut Option<&'static str>,
    ) -> io::Result<WorkflowState> {
        let command = self.proposal.command();

        Ok(match self.state {
            WorkflowState::Proposed => {
                if !self.proposal.risk_tag().requires_confirmation() {
                    return Ok(WorkflowState::Executing);
                }
                let label = match self.proposal.source_role() {
                    SourceRole::DiagnosticSuggestion => "Suggested command",
                    _ => "Proposed command",
                };
                prompter.notify(&format!("{}: {}", label, command));
                if let Some(pattern) = self.proposal.denylist_hit() {
                    prompter.warn(&format!(
                        "Note: this command contains the dangerous pattern '{}'",
                        pattern
                    ));
                }
                WorkflowState::AwaitingConfirm
            }
            WorkflowState::AwaitingConfirm => {
                let question = match self.proposal.source_role() {
                    SourceRole::DiagnosticSuggestion => {
                        format!("Would you like to execute the suggested command '{}'?", command)
                    }
                    _ => format!("Do you want to run the command '{}'?", command),
                };
                if !prompter.confirm(&question)? {
                    *cancel_message = Some(CANCELLED_MESSAGE);
                    WorkflowState::Cancelled
                } else if self.proposal.risk_tag() == RiskTag::ConfirmDestructive {
                    WorkflowState::AwaitingDestructiveConfirm
                } else {
                    WorkflowState::Executing
                }
            }
            WorkflowState::AwaitingDestructiveConfirm => {
                let question = format!(
                    "Warning: This command may be destructive. Are you sure you want to run '{}'?",
                    command
                );
                if prompter.confirm(&question)? {
                    WorkflowState::AwaitingRetype
                } else {
                    *cancel_message = Some(ABORTED_MESSAGE);
                    WorkflowState::Cancelled
                }
            }
            WorkflowState::AwaitingRetype => {
                prompter.warn("For safety, please re-type or paste the exact command to proceed:");
                let typed = prompter.read_line("> ")?;
                if typed.trim() == command {
                    WorkflowState::Verified
                } else {
                    WorkflowState::MismatchAborted
                }
            }
            WorkflowState::Verified => WorkflowState::Executing,
            terminal => terminal,
        })
    }
}

/// Convenience: run a fresh workflow for a proposal
pub fn confirm_proposal(proposal: &CommandProposal, prompter: &mut dyn Prompter) -> io::Result<Decision> {
    ConfirmationWorkflow::new(proposal).run(prompter)
}

/// Prompter answering from a script, for tests
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: VecDeque<bool>,
    lines: VecDeque<String>,
    /// Every question, line prompt and notice, in order
    pub transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(confirms: &[bool], lines: &[&str]) -> Self {
        Self {
            confirms: confirms.iter().copied().collect(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            transcript: Vec::new(),
        }
    }

    /// Scripted answers not consumed yet
    pub fn remaining(&self) -> (usize, usize) {
        (self.confirms.len(), self.lines.len())
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        self.transcript.push(format!("? {}", question));
        self.confirms
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted confirmation"))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.transcript.push(prompt.to_string());
        self.lines
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted line"))
    }

    fn notify(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}
