//! Terminal UI - colored output, prompts, and the thinking spinner

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use shellpilot_common::error::ProviderError;
use shellpilot_common::provider::TextGenerator;
use shellpilot_common::workflow::Prompter;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Read one line from stdin; `None` on EOF
pub fn read_input_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let n = io::stdin().read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Whether an answer counts as yes (`y`/`yes`, case-insensitive)
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Prompter backed by the real terminal
#[derive(Debug, Default)]
pub struct StdinPrompter {
    colors: bool,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            colors: console::colors_enabled(),
        }
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.colors {
            print!("{} {} ", question.bold(), "(yes/no):".dimmed());
        } else {
            print!("{} (yes/no): ", question);
        }
        io::stdout().flush()?;
        // EOF at a confirmation is a no
        Ok(read_input_line()?.map(|a| is_yes(&a)).unwrap_or(false))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;
        Ok(read_input_line()?.unwrap_or_default())
    }

    fn notify(&mut self, message: &str) {
        if self.colors {
            println!("{}", message.bright_cyan());
        } else {
            println!("{}", message);
        }
    }

    fn warn(&mut self, message: &str) {
        if self.colors {
            println!("{}", message.yellow());
        } else {
            println!("{}", message);
        }
    }

    fn show_output(&mut self, text: &str) {
        println!("{}", text);
    }

    fn show_error(&mut self, text: &str) {
        if self.colors {
            println!("{}", text.red());
        } else {
            println!("{}", text);
        }
    }
}

/// Spinner shown while the provider is answering
pub fn thinking_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();

    let style = if console::colors_enabled() {
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.magenta} {msg}")
    } else {
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/"])
            .template("{spinner} {msg}")
    };
    spinner.set_style(style.unwrap_or_else(|_| ProgressStyle::default_spinner()));
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Generator wrapper that shows the spinner for the duration of each call
pub struct SpinningGenerator {
    inner: Arc<dyn TextGenerator>,
}

impl SpinningGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>) -> Self {
        Self { inner }
    }
}

impl TextGenerator for SpinningGenerator {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let spinner = thinking_spinner("thinking...");
        let reply = self.inner.generate(prompt, max_tokens);
        spinner.finish_and_clear();
        reply
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

/// Print a success line
pub fn success(message: &str) {
    if console::colors_enabled() {
        println!("{}", message.green());
    } else {
        println!("{}", message);
    }
}

/// Print an error line
pub fn error(message: &str) {
    if console::colors_enabled() {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}

/// Print a section header
pub fn header(title: &str) {
    if console::colors_enabled() {
        println!("{}", title.bold().underline());
    } else {
        println!("{}", title);
    }
}

/// Clear the screen
pub fn clear_screen() {
    // Not a terminal: nothing to clear
    let _ = console::Term::stdout().clear_screen();
}
