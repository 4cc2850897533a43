//! Drafting session state and the machine that drives it.
//!
//! # Architecture
//!
//! ```text
//! SessionController
//!   ├── session: Session (document_type, template, document, transcript, ...)
//!   ├── state: SessionState (what runs next)
//!   ├── predicate: SatisfactionPredicate (when to stop)
//!   ├── generator: Arc<dyn Generator>
//!   └── channel: Arc<dyn UserChannel>
//! ```
//!
//! A [`Session`] is created with only its document type. Handlers in the
//! controller fill in the template, the draft and the transcript; fields are
//! only reachable through accessors so the append-only parts stay that way.

pub mod controller;
pub mod satisfaction;
pub mod state;

pub use controller::SessionController;
pub use satisfaction::{KeywordPredicate, SatisfactionPredicate};
pub use state::SessionState;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Assistant => write!(f, "assistant"),
            Role::User => write!(f, "user"),
        }
    }
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl TranscriptEntry {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Mutable state of one document-generation run.
///
/// # Example
///
/// ```
/// use draftloop::session::Session;
///
/// let session = Session::new("invoice");
/// assert_eq!(session.document_type(), "invoice");
/// assert!(session.template().is_empty());
/// assert!(!session.is_satisfied());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    session_id: String,
    created_at: DateTime<Utc>,
    document_type: String,
    template: String,
    document: String,
    feedback_history: Vec<String>,
    transcript: Vec<TranscriptEntry>,
    satisfied: bool,
}

impl Session {
    /// Create a session for the given document type.
    #[must_use]
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            document_type: document_type.into(),
            template: String::new(),
            document: String::new(),
            feedback_history: Vec::new(),
            transcript: Vec::new(),
            satisfied: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    /// Template produced by the first state; empty until then.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Current draft; empty until the draft state has run.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Every piece of feedback incorporated so far, oldest first.
    pub fn feedback_history(&self) -> &[String] {
        &self.feedback_history
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Number of completed revisions.
    pub fn revision_count(&self) -> usize {
        self.feedback_history.len()
    }

    /// Most recent transcript entry, if any.
    pub fn last_entry(&self) -> Option<&TranscriptEntry> {
        self.transcript.last()
    }

    /// Text of the latest entry when that entry was written by the user.
    ///
    /// Returns `None` when the transcript is empty or ends with an
    /// assistant message, i.e. when the user has not answered yet.
    pub fn latest_user_reply(&self) -> Option<&str> {
        self.transcript
            .last()
            .filter(|entry| entry.role == Role::User)
            .map(|entry| entry.text.as_str())
    }

    // =========================================================================
    // Mutators (controller only)
    // =========================================================================

    pub(crate) fn set_template(&mut self, template: String) {
        self.template = template;
    }

    pub(crate) fn set_document(&mut self, document: String) {
        self.document = document;
    }

    pub(crate) fn push_feedback(&mut self, feedback: String) {
        self.feedback_history.push(feedback);
    }

    pub(crate) fn push_assistant(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry::new(Role::Assistant, text));
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry::new(Role::User, text));
    }

    /// One-way latch; there is no way back to unsatisfied.
    pub(crate) fn mark_satisfied(&mut self) {
        self.satisfied = true;
    }
}
