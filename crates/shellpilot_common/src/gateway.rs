//! Provider Gateway - role-based requests over one text generator
//!
//! Each role carries fixed instructions. Recent conversation lives in a
//! session-owned `ConversationBuffer` with a hard message cap; the gateway
//! only reads it.

use crate::error::ProviderError;
use crate::provider::TextGenerator;
use crate::risk::{DANGER_MARKER, REFUSAL_MARKER};
use crate::system_context::SystemContext;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Gateway roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    CommandExecutor,
    ErrorHandler,
    Debugger,
    QuestionAnswerer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::CommandExecutor => "command-executor",
            Role::ErrorHandler => "error-handler",
            Role::Debugger => "debugger",
            Role::QuestionAnswerer => "question-answerer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who said a buffered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One buffered exchange message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub speaker: Speaker,
    pub content: String,
}

/// Recent conversation, oldest evicted past the limit
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: VecDeque<ChatMessage>,
    limit: usize,
}

impl ConversationBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            limit: limit.max(2),
        }
    }

    /// Record a prompt and the reply it received
    pub fn record(&mut self, role: Role, prompt: &str, reply: &str) {
        self.push(ChatMessage {
            role,
            speaker: Speaker::User,
            content: prompt.to_string(),
        });
        self.push(ChatMessage {
            role,
            speaker: Speaker::Assistant,
            content: reply.to_string(),
        });
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

/// Role-aware front door to the configured backend
pub struct ProviderGateway {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    system: SystemContext,
}

impl ProviderGateway {
    pub fn new(generator: Arc<dyn TextGenerator>, max_tokens: u32, system: SystemContext) -> Self {
        Self {
            generator,
            max_tokens,
            system,
        }
    }

    pub fn describe(&self) -> String {
        self.generator.describe()
    }

    pub fn system(&self) -> &SystemContext {
        &self.system
    }

    /// Send `prompt` under `role` with recent context and extra data
    pub fn invoke(
        &self,
        role: Role,
        prompt: &str,
        context: &ConversationBuffer,
        additional_data: &BTreeMap<String, String>,
    ) -> Result<String, ProviderError> {
        let full_prompt = self.assemble(role, prompt, context, additional_data);
        debug!(role = %role, context_messages = context.len(), "gateway invoke");

        let reply = self.generator.generate(&full_prompt, self.max_tokens)?;
        let reply = reply.trim().to_string();
        if reply.is_empty() {
            return Err(ProviderError::MalformedResponse("empty reply".to_string()));
        }
        Ok(reply)
    }

    fn assemble(
        &self,
        role: Role,
        prompt: &str,
        context: &ConversationBuffer,
        additional_data: &BTreeMap<String, String>,
    ) -> String {
        let mut out = format!("system {}\n", self.instructions(role));
        for message in context.iter() {
            out.push_str(&format!(
                "{} [{}] {}\n",
                message.speaker.as_str(),
                message.role,
                message.content
            ));
        }
        out.push_str(&format!("user {}\n", prompt.trim()));
        if !additional_data.is_empty() {
            out.push_str("system Additional data:\n");
            for (key, value) in additional_data {
                out.push_str(&format!("{}: {}\n", key, value));
            }
        }
        out.push_str("assistant ");
        out
    }

    /// Fixed instructions for a role
    pub fn instructions(&self, role: Role) -> String {
        let cwd = current_dir_display();
        let sys = &self.system;
        match role {
            Role::CommandExecutor => format!(
                "[ROLE] Shell Command Interpreter\n\
                 [TASK] Translate natural language requests into one precise shell command\n\
                 [CONTEXT]\n\
                 User: {user}\nShell: {shell}\nOS: {os} {version}\nArchitecture: {arch}\n\
                 Path: {cwd}\nInstalled: {installed}\n\
                 [GUIDELINES]\n\
                 1. Output ONLY the shell command, no explanations or code fences\n\
                 2. Prefer built-in tools over external dependencies\n\
                 3. Prefix the command with '{marker}' when it deletes files, modifies the system \
                 (chmod, format), uses the network (ssh, scp) or manages packages (apt, yum)\n\
                 4. Use OS-appropriate tools ({examples})\n\
                 5. Quote paths that contain spaces\n\
                 6. Chain multi-step work with && or ;\n\
                 [SAFETY]\n\
                 Never suggest commands that could damage the system. Reject unsafe requests \
                 with \"{refusal} <reason>\".\n\
                 [EXAMPLES]\n\
                 User: List large PDFs\nCMD: find . -name \"*.pdf\" -size +5M\n\
                 User: Delete the build folder\nCMD: {marker}rm -r ./build",
                user = sys.user,
                shell = sys.shell,
                os = sys.os_name,
                version = sys.os_version,
                arch = sys.arch,
                cwd = cwd,
                installed = sys.installed.join(", "),
                marker = DANGER_MARKER,
                examples = sys.os_examples(),
                refusal = REFUSAL_MARKER,
            ),
            Role::ErrorHandler => format!(
                "[ROLE] Command Error Diagnostician\n\
                 [TASK] Analyze a failed command and suggest one corrected command\n\
                 [CHECKS] path resolution, command availability, permissions, argument syntax, typos\n\
                 [OUTPUT FORMAT]\n\
                 [Error Type]: Brief description\n\
                 [Solution]: Single corrected command (prefix with '{marker}' if destructive)\n\
                 [Alternative]: Safer alternative if available\n\
                 [CONTEXT] OS: {os} Path: {cwd}",
                marker = DANGER_MARKER,
                os = sys.os_name,
                cwd = cwd,
            ),
            Role::Debugger => "[ROLE] Shell Environment Debugger\n\
                 [TASK] Diagnose complex system issues\n\
                 [OUTPUT STRUCTURE]\n\
                 1. Identified Issue\n2. Confidence Level (High/Med/Low)\n3. Immediate Fix\n\
                 4. Long-term Solution\n5. Verification Command"
                .to_string(),
            Role::QuestionAnswerer => format!(
                "[ROLE] Technical Knowledge Engineer\n\
                 [TASK] Provide accurate, context-aware answers\n\
                 [GUIDELINES] Start with a direct answer, add OS-specific notes, include a short \
                 example, mention alternatives and safety considerations\n\
                 [CONTEXT] OS: {os} {version} Path: {cwd}",
                os = sys.os_name,
                version = sys.os_version,
                cwd = cwd,
            ),
        }
    }
}

fn current_dir_display() -> String {
    std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
