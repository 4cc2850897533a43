//! Text generation backends.
//!
//! The session controller only ever sees the [`Generator`] trait: a prompt
//! goes in, opaque text comes out. Concrete backends live in submodules and
//! are selected at startup from [`GeneratorConfig`] via [`create_generator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use draftloop::generator::{create_generator, GeneratorConfig};
//!
//! let generator = create_generator(&GeneratorConfig::default())?;
//! let template = generator.generate("Create a template for an invoice").await?;
//! ```

pub mod claude;
pub mod openai;

pub use claude::ClaudeCliGenerator;
pub use openai::OpenAiCompatGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Abstraction over anything that turns a prompt into text.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// behind an `Arc` and used from async contexts.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for a fully composed prompt.
    ///
    /// # Errors
    ///
    /// Returns a [`GeneratorError`] if the backend is unreachable, times out,
    /// or returns something that cannot be read as text.
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;

    /// Human-readable identifier of the model behind this generator.
    fn model_name(&self) -> &str;

    /// Check whether the backend looks usable (binary present, key set).
    async fn available(&self) -> bool {
        true
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by a [`Generator`].
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// Backend unreachable, misconfigured, or rejected the request.
    #[error("Generator unavailable: {message}")]
    Unavailable { message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message} (retry after {retry_after_secs}s)")]
    RateLimited {
        message: String,
        retry_after_secs: u64,
    },

    /// No response within the configured time.
    #[error("Generator timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Response could not be interpreted as generated text.
    #[error("Malformed generator response: {message}")]
    MalformedResponse { message: String },
}

impl GeneratorError {
    /// Shorthand for [`GeneratorError::Unavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Shorthand for [`GeneratorError::MalformedResponse`].
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Check if a fresh attempt might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Unavailable { .. }
        )
    }

    /// Recommended wait before the caller retries, if known.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            Self::Timeout { .. } => Some(Duration::from_secs(10)),
            Self::Unavailable { .. } => Some(Duration::from_secs(2)),
            Self::MalformedResponse { .. } => None,
        }
    }

    /// Classify an HTTP status code and body.
    pub fn from_response(status_code: u16, body: &str) -> Self {
        match status_code {
            429 => Self::RateLimited {
                message: body.to_string(),
                retry_after_secs: extract_retry_after(body).unwrap_or(60),
            },
            408 | 504 => Self::Timeout { timeout_secs: 0 },
            400..=599 => Self::Unavailable {
                message: format!("HTTP {}: {}", status_code, body),
            },
            _ => Self::MalformedResponse {
                message: format!("HTTP {}: {}", status_code, body),
            },
        }
    }
}

/// Extract a retry-after hint in seconds from free-form error text.
pub(crate) fn extract_retry_after(body: &str) -> Option<u64> {
    let patterns = [
        r"retry.?after[:\s]+(\d+)",
        r"try again in (\d+)",
        r"(\d+)\s*seconds?",
    ];

    let lower = body.to_lowercase();
    for pattern in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            if let Some(secs) = re
                .captures(&lower)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
            {
                return Some(secs);
            }
        }
    }
    None
}

// =============================================================================
// Configuration
// =============================================================================

/// Supported generator backends.
pub const PROVIDERS: &[&str] = &["groq", "openai", "claude"];

/// Configuration for the generator backend.
///
/// Lives under the `generator` key of `.draftloop/settings.json`; CLI flags
/// override individual fields.
///
/// ```json
/// {
///   "generator": {
///     "provider": "groq",
///     "model": "llama-3.2-90b-vision-preview",
///     "temperature": 0.7,
///     "maxTokens": 2048
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Backend: "groq", "openai", or "claude".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier. Falls back to the provider default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override of the provider's API base URL.
    #[serde(default)]
    pub api_base: Option<String>,

    /// Override of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_base: None,
            api_key_env: None,
        }
    }
}

impl GeneratorConfig {
    /// Model to use, resolving the provider default when none is set.
    #[must_use]
    pub fn resolved_model(&self) -> &str {
        if let Some(model) = self.model.as_deref() {
            return model;
        }
        match self.provider.as_str() {
            "openai" => "gpt-4o",
            "claude" => "sonnet",
            _ => "llama-3.2-90b-vision-preview",
        }
    }

    /// Validate the configuration.
    ///
    /// Returns every problem found as `(field, reason)` pairs.
    pub fn validate(&self) -> Vec<(String, String)> {
        let mut problems = Vec::new();

        if !PROVIDERS.contains(&self.provider.as_str()) {
            problems.push((
                "generator.provider".to_string(),
                format!(
                    "unknown provider '{}'. Valid options: {}",
                    self.provider,
                    PROVIDERS.join(", ")
                ),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            problems.push((
                "generator.temperature".to_string(),
                format!("{} is outside 0.0..=2.0", self.temperature),
            ));
        }
        if self.max_tokens == 0 {
            problems.push((
                "generator.maxTokens".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            problems.push((
                "generator.timeoutSecs".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if matches!(self.model.as_deref(), Some(m) if m.trim().is_empty()) {
            problems.push((
                "generator.model".to_string(),
                "must not be blank".to_string(),
            ));
        }

        problems
    }
}

/// Build a generator from configuration.
///
/// # Errors
///
/// Returns an error naming the first invalid field if the configuration
/// does not validate.
pub fn create_generator(config: &GeneratorConfig) -> crate::Result<Arc<dyn Generator>> {
    if let Some((field, reason)) = config.validate().into_iter().next() {
        return Err(crate::DraftError::invalid_config(field, reason));
    }

    debug!(
        provider = %config.provider,
        model = %config.resolved_model(),
        "create_generator: building backend"
    );

    let generator: Arc<dyn Generator> = match config.provider.as_str() {
        "claude" => Arc::new(
            ClaudeCliGenerator::new(config.resolved_model()).with_timeout(config.timeout_secs),
        ),
        provider => {
            let mut generator = match provider {
                "openai" => OpenAiCompatGenerator::openai(),
                _ => OpenAiCompatGenerator::groq(),
            }
            .with_model(config.resolved_model())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(config.timeout_secs);

            if let Some(base) = config.api_base.as_deref() {
                generator = generator.with_api_base(base);
            }
            if let Some(env_var) = config.api_key_env.as_deref() {
                generator = generator.with_api_key_env(env_var);
            }
            Arc::new(generator)
        }
    };

    Ok(generator)
}
