//! Provider backends - uniform text generation over remote models
//!
//! One closed set of backends, chosen once at startup from configuration.
//! Each backend hides its own authentication and payload shape behind
//! `TextGenerator::generate`. A scripted fake is provided for tests.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept from a failed HTTP response
const MAX_ERROR_BODY: usize = 300;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Supported text-generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    Groq,
    Fireworks,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl Backend {
    pub const ALL: [Backend; 8] = [
        Backend::Ollama,
        Backend::OpenAi,
        Backend::Anthropic,
        Backend::Google,
        Backend::Groq,
        Backend::Fireworks,
        Backend::OpenRouter,
        Backend::DeepSeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ollama => "ollama",
            Backend::OpenAi => "openai",
            Backend::Anthropic => "anthropic",
            Backend::Google => "google",
            Backend::Groq => "groq",
            Backend::Fireworks => "fireworks",
            Backend::OpenRouter => "openrouter",
            Backend::DeepSeek => "deepseek",
        }
    }

    /// Conventional environment variable holding the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Backend::Ollama => None,
            Backend::OpenAi => Some("OPENAI_API_KEY"),
            Backend::Anthropic => Some("ANTHROPIC_API_KEY"),
            Backend::Google => Some("GOOGLE_API_KEY"),
            Backend::Groq => Some("GROQ_API_KEY"),
            Backend::Fireworks => Some("FIREWORKS_API_KEY"),
            Backend::OpenRouter => Some("OPENROUTER_API_KEY"),
            Backend::DeepSeek => Some("DEEPSEEK_API_KEY"),
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Backend::Ollama => "http://localhost:11434",
            Backend::OpenAi => "https://api.openai.com/v1",
            Backend::Anthropic => "https://api.anthropic.com/v1",
            Backend::Google => "https://generativelanguage.googleapis.com/v1beta",
            Backend::Groq => "https://api.groq.com/openai/v1",
            Backend::Fireworks => "https://api.fireworks.ai/inference/v1",
            Backend::OpenRouter => "https://openrouter.ai/api/v1",
            Backend::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Backend::Ollama => "llama3.2:3b",
            Backend::OpenAi => "gpt-4o-mini",
            Backend::Anthropic => "claude-3-5-haiku-latest",
            Backend::Google => "gemini-1.5-flash",
            Backend::Groq => "llama-3.1-8b-instant",
            Backend::Fireworks => "accounts/fireworks/models/llama-v3p1-8b-instruct",
            Backend::OpenRouter => "meta-llama/llama-3.1-8b-instruct",
            Backend::DeepSeek => "deepseek-chat",
        }
    }

    /// Whether requests leave this machine
    pub fn is_remote(&self) -> bool {
        !matches!(self, Backend::Ollama)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Backend::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == wanted)
            .ok_or_else(|| ProviderError::UnsupportedBackend(s.to_string()))
    }
}

/// Generic text generation capability
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a fully assembled prompt
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;

    /// Short label for banners and logs
    fn describe(&self) -> String {
        "text generator".to_string()
    }
}

/// Connection settings for one backend
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub backend: Backend,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Settings with backend defaults and no credential
    pub fn for_backend(backend: Backend) -> Self {
        Self {
            backend,
            model: backend.default_model().to_string(),
            base_url: backend.default_base_url().to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Real provider using blocking HTTP
pub struct Provider {
    settings: ProviderSettings,
    client: reqwest::blocking::Client,
}

impl Provider {
    /// Build a provider, failing early when a remote backend lacks a key
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        if let Some(env_var) = settings.backend.api_key_env() {
            let missing = settings
                .api_key
                .as_deref()
                .map(str::trim)
                .map_or(true, str::is_empty);
            if missing {
                return Err(ProviderError::MissingCredential {
                    backend: settings.backend.to_string(),
                    env_var: env_var.to_string(),
                });
            }
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { settings, client })
    }

    pub fn backend(&self) -> Backend {
        self.settings.backend
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn api_key(&self) -> &str {
        self.settings.api_key.as_deref().unwrap_or_default()
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), suffix)
    }

    /// Send a JSON request and decode the JSON reply
    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<serde_json::Value, ProviderError> {
        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.settings.timeout_secs)
            } else {
                ProviderError::Network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Http {
                backend: self.settings.backend.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
    }

    fn call_ollama(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens },
        });
        let reply = self.send(self.client.post(self.url("api/generate")).json(&body))?;
        text_at(&reply, &["response"])
    }

    fn call_openai_compatible(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let backend = self.settings.backend;
        let mut messages = Vec::new();
        if backend == Backend::Groq {
            messages.push(serde_json::json!({
                "role": "system",
                "content": "Always respond in valid JSON format using double quotes with a 'command' key.",
            }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": max_tokens,
        });
        if backend == Backend::Groq {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        if backend == Backend::DeepSeek {
            body["temperature"] = serde_json::json!(0.3);
        }

        let mut request = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(self.api_key())
            .json(&body);
        if backend == Backend::OpenRouter {
            request = request
                .header("HTTP-Referer", "https://github.com/shellpilot/shellpilot")
                .header("X-Title", "shellpilot");
        }

        let reply = self.send(request)?;
        let content = text_at(&reply, &["choices", "0", "message", "content"])?;

        if backend == Backend::Groq {
            return Ok(unwrap_command_object(&content));
        }
        Ok(content)
    }

    fn call_anthropic(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let request = self
            .client
            .post(self.url("messages"))
            .header("x-api-key", self.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let reply = self.send(request)?;
        text_at(&reply, &["content", "0", "text"])
    }

    fn call_google(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_tokens },
        });
        let url = self.url(&format!("models/{}:generateContent", self.settings.model));
        let request = self
            .client
            .post(url)
            .query(&[("key", self.api_key())])
            .json(&body);
        let reply = self.send(request)?;
        text_at(&reply, &["candidates", "0", "content", "parts", "0", "text"])
    }
}

impl TextGenerator for Provider {
    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        debug!(
            backend = %self.settings.backend,
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "provider request"
        );

        let text = match self.settings.backend {
            Backend::Ollama => self.call_ollama(prompt, max_tokens),
            Backend::OpenAi
            | Backend::Groq
            | Backend::Fireworks
            | Backend::OpenRouter
            | Backend::DeepSeek => self.call_openai_compatible(prompt, max_tokens),
            Backend::Anthropic => self.call_anthropic(prompt, max_tokens),
            Backend::Google => self.call_google(prompt, max_tokens),
        }?;

        Ok(text.trim().to_string())
    }

    fn describe(&self) -> String {
        format!("{} - {}", self.settings.model, self.settings.backend)
    }
}

/// Walk a JSON path (object keys or array indices) down to a string
fn text_at(value: &serde_json::Value, path: &[&str]) -> Result<String, ProviderError> {
    let mut current = value;
    for key in path {
        let next = match key.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(*key),
        };
        current = next.ok_or_else(|| {
            ProviderError::MalformedResponse(format!("missing field '{}' in response", path.join(".")))
        })?;
    }
    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MalformedResponse(format!("field '{}' is not text", path.join("."))))
}

/// Groq answers with `{"command": "..."}`; fall back to the raw text otherwise
fn unwrap_command_object(content: &str) -> String {
    serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| v.get("command").and_then(|c| c.as_str()).map(str::to_string))
        .unwrap_or_else(|| content.to_string())
}

/// Fake generator for testing
///
/// Replies are consumed in order; the last reply repeats once the queue
/// is down to one entry. Every prompt is recorded.
pub struct FakeGenerator {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fake that always answers with the same text
    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Fake that answers each call with the next text
    pub fn sequence(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Fake that always fails
    pub fn always_error(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// All prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl TextGenerator for FakeGenerator {
    fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| ProviderError::MalformedResponse("fake generator poisoned".to_string()))?;

        match responses.len() {
            0 => Err(ProviderError::MalformedResponse("no scripted response".to_string())),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}
