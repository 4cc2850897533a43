//! Scripted implementations of the session's collaborators.
//!
//! Both doubles replay a queue prepared up front and record what the
//! controller sent them, enabling deterministic session tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::channel::{ChannelError, UserChannel};
use crate::generator::{Generator, GeneratorError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Generator that replays queued outcomes in order.
///
/// Once the queue is empty it answers with the fallback text if one was
/// set, and fails with [`GeneratorError::Unavailable`] otherwise.
///
/// # Example
///
/// ```rust
/// use draftloop::testing::ScriptedGenerator;
/// use draftloop::generator::GeneratorError;
///
/// let generator = ScriptedGenerator::new()
///     .then_respond("TEMPLATE")
///     .then_fail(GeneratorError::Timeout { timeout_secs: 30 });
/// assert_eq!(generator.remaining(), 2);
/// ```
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GeneratorError>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicU32,
    model: String,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
            model: "scripted".to_string(),
        }
    }
}

impl ScriptedGenerator {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    #[must_use]
    pub fn then_respond(self, text: &str) -> Self {
        lock(&self.script).push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn then_fail(self, error: GeneratorError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Text returned for every call after the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = Some(text.to_string());
        self
    }

    /// Set the reported model name.
    #[must_use]
    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model = name.to_string();
        self
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Queued outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(prompt.to_string());

        match lock(&self.script).pop_front() {
            Some(outcome) => outcome,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GeneratorError::unavailable("generator script exhausted")),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// User channel that replays queued replies and then reports closure.
///
/// # Example
///
/// ```rust
/// use draftloop::testing::ScriptedChannel;
///
/// let channel = ScriptedChannel::new(["Client: Acme", "looks good"]);
/// assert_eq!(channel.remaining(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    replies: Mutex<VecDeque<String>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    /// Channel that answers with `replies` in order.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Channel that is already closed.
    #[must_use]
    pub fn closed() -> Self {
        Self::default()
    }

    /// Every message shown to the user, in order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl UserChannel for ScriptedChannel {
    async fn prompt_user(&self, message: &str) -> Result<String, ChannelError> {
        lock(&self.messages).push(message.to_string());
        lock(&self.replies).pop_front().ok_or(ChannelError::Closed)
    }
}
