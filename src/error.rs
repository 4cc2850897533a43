//! Custom error types for draftloop.
//!
//! Every way a drafting session can abort is a variant of [`DraftError`].
//! None of them are retried inside the controller; callers decide whether
//! to start the whole run again.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::channel::ChannelError;
use crate::generator::GeneratorError;
use crate::session::state::SessionState;

/// Main error type for draftloop operations
#[derive(Error, Debug)]
pub enum DraftError {
    // =========================================================================
    // Session Errors
    // =========================================================================
    /// The generator could not produce text for a state.
    #[error("Generation failed during {state}: {source}")]
    GenerationFailure {
        state: SessionState,
        #[source]
        source: GeneratorError,
    },

    /// No reply could be obtained from the user.
    #[error("User channel failed during {state}: {source}")]
    UserChannelFailure {
        state: SessionState,
        #[source]
        source: ChannelError,
    },

    /// A state handler ran with its precondition unmet.
    #[error("Invariant violated in {state}: {detail}")]
    InvariantViolation { state: SessionState, detail: String },

    /// The opt-in revision ceiling was reached before the user was satisfied.
    #[error("Revision limit ({max}) reached without user satisfaction")]
    RevisionLimit { max: u32 },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DraftError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a generation failure for the given state
    pub fn generation(state: SessionState, source: GeneratorError) -> Self {
        Self::GenerationFailure { state, source }
    }

    /// Create a user channel failure for the given state
    pub fn channel(state: SessionState, source: ChannelError) -> Self {
        Self::UserChannelFailure { state, source }
    }

    /// Create an invariant violation for the given state
    pub fn invariant(state: SessionState, detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            state,
            detail: detail.into(),
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// The state the session was in when it aborted, if any.
    pub fn state(&self) -> Option<SessionState> {
        match self {
            Self::GenerationFailure { state, .. }
            | Self::UserChannelFailure { state, .. }
            | Self::InvariantViolation { state, .. } => Some(*state),
            _ => None,
        }
    }

    /// Check if re-running the whole session has a chance of succeeding.
    ///
    /// Only transient generator failures qualify. A closed user channel or a
    /// broken invariant will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Suggested wait before re-running, for retryable failures only.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::GenerationFailure { source, .. } if source.is_retryable() => {
                source.retry_after()
            }
            _ => None,
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GenerationFailure { .. } => 3,
            Self::UserChannelFailure { .. } => 4,
            Self::InvariantViolation { .. } => 5,
            Self::RevisionLimit { .. } => 6,
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for draftloop results
pub type Result<T> = std::result::Result<T, DraftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_display() {
        let err = DraftError::generation(
            SessionState::Draft,
            GeneratorError::Timeout { timeout_secs: 30 },
        );
        let msg = err.to_string();
        assert!(msg.contains("draft"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_channel_failure_display() {
        let err = DraftError::channel(SessionState::GatherInfo, ChannelError::Closed);
        assert!(err.to_string().contains("gather_info"));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_state_accessor() {
        let err = DraftError::invariant(SessionState::Revise, "template is empty");
        assert_eq!(err.state(), Some(SessionState::Revise));
        assert_eq!(DraftError::invalid_config("maxRevisions", "bad").state(), None);
    }

    #[test]
    fn test_is_retryable() {
        assert!(DraftError::generation(
            SessionState::Template,
            GeneratorError::Timeout { timeout_secs: 5 }
        )
        .is_retryable());
        assert!(!DraftError::generation(
            SessionState::Template,
            GeneratorError::MalformedResponse {
                message: "no choices".into()
            }
        )
        .is_retryable());
        assert!(!DraftError::channel(SessionState::RequestFeedback, ChannelError::Closed)
            .is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = DraftError::generation(
            SessionState::RequestFeedback,
            GeneratorError::RateLimited {
                message: "slow down".into(),
                retry_after_secs: 30,
            },
        );
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(30)));

        let malformed = DraftError::generation(
            SessionState::Draft,
            GeneratorError::malformed("no choices"),
        );
        assert_eq!(malformed.retry_after(), None);
        assert_eq!(
            DraftError::channel(SessionState::GatherInfo, ChannelError::Closed).retry_after(),
            None
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            DraftError::generation(
                SessionState::Draft,
                GeneratorError::Unavailable {
                    message: "down".into()
                }
            )
            .exit_code(),
            3
        );
        assert_eq!(
            DraftError::channel(SessionState::GatherInfo, ChannelError::Closed).exit_code(),
            4
        );
        assert_eq!(
            DraftError::invariant(SessionState::Draft, "x").exit_code(),
            5
        );
        assert_eq!(DraftError::RevisionLimit { max: 3 }.exit_code(), 6);
        assert_eq!(
            DraftError::config_with_path("test", PathBuf::from("settings.json")).exit_code(),
            7
        );
        assert_eq!(DraftError::invalid_config("a", "b").exit_code(), 7);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/test/settings.json");
        let err = DraftError::config_with_path("failed to parse", path.clone());
        if let DraftError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: DraftError = io_err.into();
        assert!(matches!(err, DraftError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
