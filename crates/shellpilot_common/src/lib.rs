//! Shellpilot Common - the command-safety pipeline behind the shellpilot CLI
//!
//! Everything here is terminal-agnostic: user interaction goes through the
//! `Prompter` trait, command execution through `CommandRunner`, and model
//! calls through `TextGenerator`, so the whole pipeline runs in tests with
//! scripted fakes.

pub mod alias;
pub mod config;
pub mod data_gatherer;
pub mod diagnostic;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod history;
pub mod paths;
pub mod proposal;
pub mod provider;
pub mod risk;
pub mod session;
pub mod system_context;
pub mod workflow;

pub use alias::{AliasTable, Expansion, ImportReport};
pub use config::Config;
pub use error::{AliasError, ConfigError, ProviderError};
pub use executor::{CommandRunner, ExecutionMode, ExecutionResult, Executor};
pub use gateway::{ConversationBuffer, ProviderGateway, Role};
pub use history::{CommandHistory, HistoryLog, HistoryRecord};
pub use proposal::{CommandProposal, SourceRole};
pub use provider::{Backend, Provider, ProviderSettings, TextGenerator};
pub use risk::RiskTag;
pub use session::{Ending, ExecutedCommand, Outcome, Session, SessionLimits};
pub use system_context::SystemContext;
pub use workflow::{ConfirmationWorkflow, Decision, Prompter, ScriptedPrompter};
