//! REPL - the interactive line loop
//!
//! Reads one line at a time, routes it, and lets the session finish the
//! whole request (including any diagnostic follow-ups) before prompting
//! again.

use crate::alias_command;
use crate::intent_router::{route_intent, Intent};
use crate::terminal::{self, StdinPrompter};
use anyhow::Result;
use owo_colors::OwoColorize;
use shellpilot_common::session::{Ending, Session};
use shellpilot_common::workflow::Prompter;
use std::io::{self, Write};
use tracing::{debug, error};

pub const TERMINATING_MESSAGE: &str = "Terminating...";

pub const HELP: &str = "Usage:
  <request>            Describe what you want; the command is shown for confirmation
  !<command>           Run a command directly (aliases expand, no confirmation)
  ?<question>          Ask a question (a trailing '?' works too)
  debug <problem>      Ask for a diagnosis of a system problem
  alias <subcommand>   Manage aliases (alias help for details)
  history              Show recent commands
  clear | cls          Clear the screen
  help                 Show this help
  quit | exit          Leave shellpilot

Commands the model marks as destructive need a second confirmation and the
exact command re-typed before they run.";

/// Banner shown once at startup
pub fn print_banner(version: &str, session: &Session) {
    let system = session.gateway().system();
    if console::colors_enabled() {
        println!("{} {}", "shellpilot".bold().bright_cyan(), version.dimmed());
    } else {
        println!("shellpilot {}", version);
    }
    println!("Backend: {}", session.gateway().describe());
    println!("System:  {}", system.summary());
    println!("Type 'help' for usage, 'exit' to quit.");
    println!();
}

fn print_prompt() -> io::Result<()> {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "?".to_string());
    if console::colors_enabled() {
        print!("{}{} ", cwd.bright_blue(), "$".bold());
    } else {
        print!("{}$ ", cwd);
    }
    io::stdout().flush()
}

/// Run until exit or EOF
pub fn run(session: &mut Session) -> Result<()> {
    let mut prompter = StdinPrompter::new();

    loop {
        print_prompt()?;
        let line = terminal::read_input_line()?;

        let Some(line) = line else {
            println!();
            println!("{}", TERMINATING_MESSAGE);
            return Ok(());
        };

        let intent = route_intent(&line);
        debug!(?intent, "routed input");

        if intent == Intent::Exit {
            println!("{}", TERMINATING_MESSAGE);
            return Ok(());
        }
        dispatch(session, &mut prompter, intent)?;
    }
}

/// Handle one routed line
pub fn dispatch(session: &mut Session, prompter: &mut dyn Prompter, intent: Intent) -> Result<()> {
    match intent {
        Intent::Empty | Intent::Exit => {}
        Intent::Clear => terminal::clear_screen(),
        Intent::Help => println!("{}", HELP),
        Intent::History => show_history(session),
        Intent::Alias(args) => {
            let reply = alias_command::handle(&args, session.aliases_mut());
            if reply.is_error() {
                prompter.show_error(reply.text());
            } else {
                println!("{}", reply.text());
            }
        }
        Intent::Debug(problem) => match session.debug_problem(&problem) {
            Ok(analysis) => println!("{}", analysis),
            Err(e) => prompter.show_error(&format!("Error in processing: {}", e)),
        },
        Intent::Question(question) => match session.answer_question(&question) {
            Ok(answer) => println!("{}", answer),
            Err(e) => prompter.show_error(&format!("Error in processing: {}", e)),
        },
        Intent::Direct(command) => {
            if command.is_empty() {
                prompter.warn("Please provide a command after '!'.");
                return Ok(());
            }
            let outcome = session.handle_direct(&command, prompter)?;
            report(&outcome.ending, prompter);
        }
        Intent::Translate(request) => {
            let outcome = session.handle_request(&request, prompter)?;
            report(&outcome.ending, prompter);
        }
    }
    Ok(())
}

fn report(ending: &Ending, prompter: &mut dyn Prompter) {
    match ending {
        Ending::Finished => {}
        Ending::Cancelled(message) | Ending::MismatchAborted(message) => prompter.warn(message),
        Ending::Refused(message) | Ending::ProviderFailed(message) => {
            error!(%message, "request failed");
            prompter.show_error(message);
        }
    }
}

fn show_history(session: &Session) {
    match session.persisted_history(0) {
        Ok(records) if !records.is_empty() => {
            terminal::header("Command history");
            for record in records {
                println!(
                    "{}  {}  ->  {}",
                    record.timestamp, record.natural_language, record.shell_command
                );
            }
        }
        Ok(_) => {
            let recent: Vec<&str> = session.history().iter().collect();
            if recent.is_empty() {
                println!("No commands yet.");
            } else {
                terminal::header("Recent commands");
                for command in recent {
                    println!("  {}", command);
                }
            }
        }
        Err(e) => terminal::error(&format!("Failed to read history: {}", e)),
    }
}
