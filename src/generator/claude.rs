//! Generator backed by the `claude` CLI in print mode.
//!
//! The prompt is written to the CLI's stdin and its stdout is taken as the
//! generated text. Useful where an Anthropic subscription is available but
//! no HTTP API key is.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use super::{extract_retry_after, Generator, GeneratorError};

/// Generator that shells out to `claude -p`.
#[derive(Debug, Clone)]
pub struct ClaudeCliGenerator {
    /// CLI binary to execute.
    binary: String,
    /// Model alias passed to `--model` (e.g. "sonnet", "opus").
    model: String,
    /// Timeout in seconds for one invocation.
    timeout_secs: u64,
}

impl ClaudeCliGenerator {
    /// Default timeout for one invocation (5 minutes).
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Create a generator for the given model alias.
    #[must_use]
    pub fn new(model: &str) -> Self {
        Self {
            binary: "claude".to_string(),
            model: model.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Use a different binary (wrapper scripts, absolute paths).
    #[must_use]
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Set the invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Classify a failed CLI run from its stderr.
fn classify_failure(stderr: &str, exit_code: i32, timeout_secs: u64) -> GeneratorError {
    let lower = stderr.to_lowercase();

    if lower.contains("rate limit") || lower.contains("too many requests") {
        return GeneratorError::RateLimited {
            message: stderr.trim().to_string(),
            retry_after_secs: extract_retry_after(stderr).unwrap_or(60),
        };
    }
    if lower.contains("timed out") || lower.contains("timeout") {
        return GeneratorError::Timeout { timeout_secs };
    }

    GeneratorError::unavailable(format!(
        "claude exited with code {}: {}",
        exit_code,
        stderr.trim()
    ))
}

#[async_trait]
impl Generator for ClaudeCliGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        debug!(
            "Running {} with model {} ({} chars prompt)",
            self.binary,
            self.model,
            prompt.len()
        );

        let mut child = match AsyncCommand::new(&self.binary)
            .args(["-p", "--model", self.model.as_str(), "--output-format", "text"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GeneratorError::unavailable(format!(
                    "The '{}' CLI is not installed or not in PATH",
                    self.binary
                )));
            }
            Err(e) => {
                return Err(GeneratorError::unavailable(format!(
                    "Failed to spawn {}: {}",
                    self.binary, e
                )));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| GeneratorError::unavailable(format!("Failed to write prompt: {}", e)))?;
            stdin
                .flush()
                .await
                .map_err(|e| GeneratorError::unavailable(format!("Failed to flush stdin: {}", e)))?;
        }

        let output = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(GeneratorError::unavailable(format!(
                    "Failed to read output: {}",
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
            return Err(classify_failure(
                &stderr,
                output.status.code().unwrap_or(-1),
                self.timeout_secs,
            ));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| GeneratorError::malformed(format!("Output was not UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Err(GeneratorError::malformed("claude produced no output"));
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}
