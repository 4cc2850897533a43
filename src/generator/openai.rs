//! OpenAI-compatible chat-completions backend.
//!
//! Groq and OpenAI expose the same `/chat/completions` shape, so one
//! implementation serves both; only the base URL, key variable, and default
//! model differ. Requests go out through `curl` as a subprocess, bounded by
//! a tokio timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use draftloop::generator::{Generator, OpenAiCompatGenerator};
//!
//! let generator = OpenAiCompatGenerator::groq()
//!     .with_temperature(0.7)
//!     .with_max_tokens(2048);
//!
//! let text = generator.generate("Create a template for a cover letter").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use super::{extract_retry_after, Generator, GeneratorError};

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

/// Choice in API response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

// =============================================================================
// Generator
// =============================================================================

/// Generator for any OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatGenerator {
    /// Model identifier sent in the request.
    model: String,
    /// Environment variable holding the API key.
    api_key_env: String,
    /// API base URL, without the trailing `/chat/completions`.
    api_base: String,
    /// Sampling temperature.
    temperature: f32,
    /// Maximum output tokens.
    max_tokens: u32,
    /// Request timeout in seconds.
    timeout_secs: u64,
}

impl OpenAiCompatGenerator {
    /// Default timeout for requests (2 minutes).
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Groq's OpenAI-compatible base URL.
    pub const GROQ_API_BASE: &'static str = "https://api.groq.com/openai/v1";

    /// OpenAI's base URL.
    pub const OPENAI_API_BASE: &'static str = "https://api.openai.com/v1";

    /// Create a generator against an arbitrary endpoint.
    #[must_use]
    pub fn new(api_base: &str, api_key_env: &str, model: &str) -> Self {
        Self {
            model: model.to_string(),
            api_key_env: api_key_env.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Groq with its default model.
    #[must_use]
    pub fn groq() -> Self {
        Self::new(
            Self::GROQ_API_BASE,
            "GROQ_API_KEY",
            "llama-3.2-90b-vision-preview",
        )
    }

    /// OpenAI with its default model.
    #[must_use]
    pub fn openai() -> Self {
        Self::new(Self::OPENAI_API_BASE, "OPENAI_API_KEY", "gpt-4o")
    }

    /// Set the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set the environment variable name for the API key.
    #[must_use]
    pub fn with_api_key_env(mut self, env_var: &str) -> Self {
        self.api_key_env = env_var.to_string();
        self
    }

    /// Set a custom API base URL (proxies, self-hosted gateways).
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum output tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn api_key(&self) -> Result<String, GeneratorError> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(GeneratorError::unavailable(format!(
                "API key not found in environment variable '{}'",
                self.api_key_env
            ))),
        }
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// POST the request with curl and return the raw output: the response
    /// body followed by a final line holding the HTTP status.
    async fn post(&self, api_key: &str, body_json: &str) -> Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut command = tokio::process::Command::new("curl");
        command
            .args([
                "-s",
                "-X",
                "POST",
                &url,
                "-H",
                &format!("Authorization: Bearer {}", api_key),
                "-H",
                "Content-Type: application/json",
                "-d",
                body_json,
                "--max-time",
                &self.timeout_secs.to_string(),
                "-w",
                "\n%{http_code}",
            ])
            .kill_on_drop(true);

        let output = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            command.output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GeneratorError::unavailable(
                    "curl is not installed or not in PATH",
                ));
            }
            Ok(Err(e)) => {
                return Err(GeneratorError::unavailable(format!(
                    "Failed to execute curl: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(GeneratorError::Timeout {
                    timeout_secs: self.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // curl exit code 28 is "operation timed out"
            if output.status.code() == Some(28) || stderr.contains("timed out") {
                return Err(GeneratorError::Timeout {
                    timeout_secs: self.timeout_secs,
                });
            }
            return Err(GeneratorError::unavailable(format!(
                "curl failed: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Split curl's `-w "\n%{http_code}"` trailer off the response body.
fn split_status(raw: &str) -> (Option<u16>, &str) {
    match raw.rsplit_once('\n') {
        Some((body, code)) => match code.trim().parse::<u16>() {
            Ok(status) => (Some(status), body),
            Err(_) => (None, raw),
        },
        None => (None, raw),
    }
}

/// Classify raw curl output by HTTP status, then parse successful bodies.
///
/// Non-2xx statuses are classified by status first, so a gateway error
/// page stays a retryable failure instead of a malformed response.
fn parse_response(raw: &str, timeout_secs: u64) -> Result<String, GeneratorError> {
    let (status, body) = split_status(raw);

    match status {
        Some(code) if !(200..300).contains(&code) => Err(status_error(code, body, timeout_secs)),
        _ => parse_completion(body),
    }
}

fn status_error(code: u16, body: &str, timeout_secs: u64) -> GeneratorError {
    match GeneratorError::from_response(code, body.trim()) {
        GeneratorError::Timeout { .. } => GeneratorError::Timeout { timeout_secs },
        GeneratorError::Unavailable { message } => match parse_completion(body) {
            // JSON error bodies carry a better message than the status line
            Err(e @ (GeneratorError::Unavailable { .. } | GeneratorError::RateLimited { .. })) => e,
            _ => GeneratorError::Unavailable { message },
        },
        other => other,
    }
}

/// Turn a raw chat-completions body into generated text.
fn parse_completion(body: &str) -> Result<String, GeneratorError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        GeneratorError::malformed(format!("Failed to parse response: {} - Body: {}", e, body))
    })?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error");
        let error_type = error.get("type").and_then(|t| t.as_str()).unwrap_or("");
        let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("");

        if error_type.contains("rate_limit") || code.contains("rate_limit") {
            return Err(GeneratorError::RateLimited {
                message: message.to_string(),
                retry_after_secs: extract_retry_after(message).unwrap_or(60),
            });
        }
        return Err(GeneratorError::unavailable(message.to_string()));
    }

    let response: ChatCompletionResponse = serde_json::from_value(value)
        .map_err(|e| GeneratorError::malformed(format!("Unexpected response shape: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GeneratorError::malformed("response contained no choices"))?;

    if content.trim().is_empty() {
        return Err(GeneratorError::malformed("response content was empty"));
    }

    Ok(content)
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let api_key = self.api_key()?;
        let body_json = serde_json::to_string(&self.request_body(prompt))
            .map_err(|e| GeneratorError::malformed(format!("Failed to serialize request: {}", e)))?;

        debug!(
            "Sending request to {} at {} ({} chars prompt)",
            self.model,
            self.api_base,
            prompt.len()
        );

        let raw = self.post(&api_key, &body_json).await?;
        let result = parse_response(&raw, self.timeout_secs);

        match &result {
            Ok(text) => debug!("Received {} chars from {}", text.len(), self.model),
            Err(e) => warn!("Generation with {} failed: {}", self.model, e),
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn available(&self) -> bool {
        self.api_key().is_ok() && which::which("curl").is_ok()
    }
}
