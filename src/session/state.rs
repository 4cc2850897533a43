//! Session states and the transition table.
//!
//! ```text
//! Template -> GatherInfo -> Draft -> RequestFeedback -> CheckSatisfaction
//!                                          ^                  |      |
//!                                          |               (no)   (yes)
//!                                          +---- Revise <-----+      |
//!                                                                    v
//!                                                                  Done
//! ```

use serde::{Deserialize, Serialize};

/// States of a drafting session.
///
/// # Example
///
/// ```
/// use draftloop::session::SessionState;
///
/// let state = SessionState::Template;
/// assert_eq!(state.to_string(), "template");
/// assert_eq!(state.next(false), SessionState::GatherInfo);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Ask the generator for a structured template.
    Template,
    /// Ask the generator for questions, then wait for the user's answers.
    GatherInfo,
    /// Build the first full document from template and answers.
    Draft,
    /// Ask the generator for a feedback request, then wait for the user.
    RequestFeedback,
    /// Evaluate the termination predicate on the latest user reply.
    CheckSatisfaction,
    /// Rewrite the document with the latest feedback.
    Revise,
    /// Terminal.
    Done,
}

impl SessionState {
    /// State that follows this one.
    ///
    /// `satisfied` only matters for [`SessionState::CheckSatisfaction`];
    /// everywhere else the successor is fixed.
    #[must_use]
    pub const fn next(self, satisfied: bool) -> Self {
        match self {
            Self::Template => Self::GatherInfo,
            Self::GatherInfo => Self::Draft,
            Self::Draft => Self::RequestFeedback,
            Self::RequestFeedback => Self::CheckSatisfaction,
            Self::CheckSatisfaction if satisfied => Self::Done,
            Self::CheckSatisfaction => Self::Revise,
            Self::Revise => Self::RequestFeedback,
            Self::Done => Self::Done,
        }
    }

    /// Whether this state calls the generator.
    #[must_use]
    pub const fn calls_generator(self) -> bool {
        !matches!(self, Self::CheckSatisfaction | Self::Done)
    }

    /// Whether this state waits for the user.
    #[must_use]
    pub const fn awaits_user(self) -> bool {
        matches!(self, Self::GatherInfo | Self::RequestFeedback)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Stable snake_case name, used in logs and error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::GatherInfo => "gather_info",
            Self::Draft => "draft",
            Self::RequestFeedback => "request_feedback",
            Self::CheckSatisfaction => "check_satisfaction",
            Self::Revise => "revise",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
