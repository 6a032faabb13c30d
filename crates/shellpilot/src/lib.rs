//! Shellpilot library - exposes the CLI modules for testing

pub mod alias_command;
pub mod errors;
pub mod intent_router;
pub mod logging;
pub mod repl;
pub mod terminal;
