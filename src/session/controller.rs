//! The drafting state machine.
//!
//! [`SessionController`] owns a [`Session`] and executes one
//! [`SessionState`] per [`step`](SessionController::step). Each state runs
//! to completion, including any wait on the generator or the user, before
//! the next one starts. Failures abort the run without retrying and leave
//! the controller parked on the state that failed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::satisfaction::{KeywordPredicate, SatisfactionPredicate};
use super::state::SessionState;
use super::Session;
use crate::channel::UserChannel;
use crate::error::{DraftError, Result};
use crate::generator::{Generator, GeneratorError};
use crate::prompts;

/// Drives one session from template to final document.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use draftloop::channel::TerminalChannel;
/// use draftloop::generator::{create_generator, GeneratorConfig};
/// use draftloop::session::SessionController;
///
/// let generator = create_generator(&GeneratorConfig::default())?;
/// let channel = Arc::new(TerminalChannel::stdio());
///
/// let mut controller = SessionController::new("invoice", generator, channel);
/// let session = controller.run().await?;
/// println!("{}", session.document());
/// ```
pub struct SessionController {
    session: Session,
    state: SessionState,
    trace: Vec<SessionState>,
    generator: Arc<dyn Generator>,
    channel: Arc<dyn UserChannel>,
    predicate: Box<dyn SatisfactionPredicate>,
    max_revisions: Option<u32>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.session.session_id())
            .field("state", &self.state)
            .field("model", &self.generator.model_name())
            .field("max_revisions", &self.max_revisions)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller for a fresh session.
    ///
    /// The keyword predicate is installed and revisions are unbounded.
    pub fn new(
        document_type: impl Into<String>,
        generator: Arc<dyn Generator>,
        channel: Arc<dyn UserChannel>,
    ) -> Self {
        Self {
            session: Session::new(document_type),
            state: SessionState::Template,
            trace: Vec::new(),
            generator,
            channel,
            predicate: Box::new(KeywordPredicate::default()),
            max_revisions: None,
        }
    }

    /// Replace the satisfaction predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl SatisfactionPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    /// Cap the number of revisions; `None` means unbounded.
    #[must_use]
    pub fn with_max_revisions(mut self, max_revisions: Option<u32>) -> Self {
        self.max_revisions = max_revisions;
        self
    }

    /// State that the next [`step`](Self::step) will execute.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// States executed so far, in order.
    pub fn trace(&self) -> &[SessionState] {
        &self.trace
    }

    /// Run states until the session is done.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any state. The session keeps
    /// everything committed before the failure and is not marked satisfied.
    pub async fn run(&mut self) -> Result<&Session> {
        info!(
            "Starting '{}' session {} with {}",
            self.session.document_type(),
            self.session.session_id(),
            self.generator.model_name()
        );

        while !self.state.is_terminal() {
            self.step().await?;
        }

        info!(
            "Session {} finished after {} revision(s)",
            self.session.session_id(),
            self.session.revision_count()
        );
        Ok(&self.session)
    }

    /// Execute the current state and advance.
    ///
    /// Returns the new current state. Stepping a finished session is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// On failure the current state is left unchanged.
    pub async fn step(&mut self) -> Result<SessionState> {
        let state = self.state;
        if state.is_terminal() {
            return Ok(state);
        }

        info!("Session {}: {}", self.session.session_id(), state);
        debug!(
            calls_generator = state.calls_generator(),
            awaits_user = state.awaits_user(),
            "Session {}: entering {}",
            self.session.session_id(),
            state
        );

        let outcome = match state {
            SessionState::Template => self.build_template().await,
            SessionState::GatherInfo => self.gather_info().await,
            SessionState::Draft => self.draft().await,
            SessionState::RequestFeedback => self.request_feedback().await,
            SessionState::CheckSatisfaction => self.check_satisfaction(),
            SessionState::Revise => self.revise().await,
            SessionState::Done => Ok(()),
        };

        if let Err(e) = outcome {
            warn!(
                "Session {} aborted in {}: {}",
                self.session.session_id(),
                state,
                e
            );
            return Err(e);
        }

        self.trace.push(state);
        self.state = state.next(self.session.is_satisfied());
        debug!("Session {}: {} -> {}", self.session.session_id(), state, self.state);
        Ok(self.state)
    }

    // =========================================================================
    // State handlers
    // =========================================================================

    async fn build_template(&mut self) -> Result<()> {
        let prompt = prompts::template_prompt(self.session.document_type());
        let template = self.generate(SessionState::Template, &prompt).await?;
        self.session.set_template(template);
        Ok(())
    }

    async fn gather_info(&mut self) -> Result<()> {
        let state = SessionState::GatherInfo;
        self.require_template(state)?;

        let prompt = prompts::gather_info_prompt(self.session.template());
        let questions = self.generate(state, &prompt).await?;
        self.exchange(state, questions).await
    }

    async fn draft(&mut self) -> Result<()> {
        let state = SessionState::Draft;
        self.require_template(state)?;
        let user_info = self.require_user_reply(state)?;

        let prompt = prompts::draft_prompt(self.session.template(), &user_info);
        let document = self.generate(state, &prompt).await?;
        self.session.set_document(document);
        Ok(())
    }

    async fn request_feedback(&mut self) -> Result<()> {
        let state = SessionState::RequestFeedback;
        self.require_document(state)?;

        let prompt = prompts::feedback_request_prompt(self.session.document());
        let request = self.generate(state, &prompt).await?;
        self.exchange(state, request).await
    }

    fn check_satisfaction(&mut self) -> Result<()> {
        let state = SessionState::CheckSatisfaction;
        let reply = self.require_user_reply(state)?;

        if self.predicate.is_satisfied(&reply) {
            debug!("Session {}: user is satisfied", self.session.session_id());
            self.session.mark_satisfied();
            return Ok(());
        }

        if let Some(max) = self.max_revisions {
            if self.session.revision_count() >= max as usize {
                return Err(DraftError::RevisionLimit { max });
            }
        }
        Ok(())
    }

    async fn revise(&mut self) -> Result<()> {
        let state = SessionState::Revise;
        if self.session.is_satisfied() {
            return Err(DraftError::invariant(state, "session is already satisfied"));
        }
        self.require_template(state)?;
        self.require_document(state)?;
        let feedback = self.require_user_reply(state)?;

        let prompt = prompts::revise_prompt(self.session.document(), &feedback);
        let document = self.generate(state, &prompt).await?;
        self.session.set_document(document);
        self.session.push_feedback(feedback);
        Ok(())
    }

    // =========================================================================
    // Collaborator calls
    // =========================================================================

    async fn generate(&self, state: SessionState, prompt: &str) -> Result<String> {
        debug!("{}: sending {} chars to generator", state, prompt.len());

        let text = self
            .generator
            .generate(prompt)
            .await
            .map_err(|e| DraftError::generation(state, e))?;

        // Every later state depends on non-empty output
        if text.trim().is_empty() {
            return Err(DraftError::generation(
                state,
                GeneratorError::malformed("generator returned empty text"),
            ));
        }

        debug!("{}: received {} chars from generator", state, text.len());
        Ok(text)
    }

    /// Record the assistant message, wait for the user, record the reply.
    async fn exchange(&mut self, state: SessionState, message: String) -> Result<()> {
        self.session.push_assistant(message.clone());

        let reply = self
            .channel
            .prompt_user(&message)
            .await
            .map_err(|e| DraftError::channel(state, e))?;

        debug!("{}: user replied with {} chars", state, reply.len());
        self.session.push_user(reply);
        Ok(())
    }

    // =========================================================================
    // Preconditions
    // =========================================================================

    fn require_template(&self, state: SessionState) -> Result<()> {
        if self.session.template().is_empty() {
            return Err(DraftError::invariant(state, "template is empty"));
        }
        Ok(())
    }

    fn require_document(&self, state: SessionState) -> Result<()> {
        if self.session.document().is_empty() {
            return Err(DraftError::invariant(state, "document is empty"));
        }
        Ok(())
    }

    fn require_user_reply(&self, state: SessionState) -> Result<String> {
        self.session
            .latest_user_reply()
            .map(str::to_string)
            .ok_or_else(|| DraftError::invariant(state, "latest transcript entry is not a user reply"))
    }
}
