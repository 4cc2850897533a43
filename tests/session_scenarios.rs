//! End-to-end drafting sessions driven by scripted collaborators.
//!
//! These tests only use the public API, the same way an embedding host
//! would drive a session.

use std::sync::Arc;

use draftloop::channel::ChannelError;
use draftloop::generator::GeneratorError;
use draftloop::session::{KeywordPredicate, Role, SatisfactionPredicate, SessionState};
use draftloop::testing::{ScriptedChannel, ScriptedGenerator};
use draftloop::{DraftError, SessionController};

fn controller(
    generator: ScriptedGenerator,
    channel: ScriptedChannel,
) -> (SessionController, Arc<ScriptedGenerator>, Arc<ScriptedChannel>) {
    let generator = Arc::new(generator);
    let channel = Arc::new(channel);
    let controller = SessionController::new("invoice", generator.clone(), channel.clone());
    (controller, generator, channel)
}

fn position(trace: &[SessionState], state: SessionState) -> usize {
    trace
        .iter()
        .position(|s| *s == state)
        .unwrap_or_else(|| panic!("{} missing from trace {:?}", state, trace))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_satisfied_on_first_draft() {
    let (mut controller, generator, channel) = controller(
        ScriptedGenerator::new()
            .then_respond("T")
            .then_respond("Q")
            .then_respond("D1")
            .then_respond("What do you think of the draft?"),
        ScriptedChannel::new(["Client: Acme, Amount: $500", "looks good"]),
    );

    let session = controller.run().await.unwrap();

    assert!(session.is_satisfied());
    assert_eq!(session.template(), "T");
    assert_eq!(session.document(), "D1");
    assert!(session.feedback_history().is_empty());
    assert_eq!(session.transcript().len(), 4);

    assert_eq!(generator.call_count(), 4);
    assert_eq!(generator.remaining(), 0);
    assert_eq!(channel.remaining(), 0);
    assert_eq!(
        controller.trace(),
        [
            SessionState::Template,
            SessionState::GatherInfo,
            SessionState::Draft,
            SessionState::RequestFeedback,
            SessionState::CheckSatisfaction,
        ]
    );

    // The user's details reach the drafting prompt
    assert!(generator.prompts()[2].contains("Client: Acme, Amount: $500"));
}

#[tokio::test]
async fn test_one_revision_then_satisfied() {
    let (mut controller, generator, _) = controller(
        ScriptedGenerator::new()
            .then_respond("T")
            .then_respond("Q")
            .then_respond("D1")
            .then_respond("Any feedback?")
            .then_respond("D2")
            .then_respond("Any more feedback?"),
        ScriptedChannel::new([
            "Client: Acme, Amount: $500",
            "make it more formal",
            "satisfied",
        ]),
    );

    let session = controller.run().await.unwrap();

    assert!(session.is_satisfied());
    assert_eq!(session.document(), "D2");
    assert_eq!(session.feedback_history(), ["make it more formal"]);
    assert_eq!(session.revision_count(), 1);
    assert_eq!(generator.call_count(), 6);

    let trace = controller.trace();
    assert_eq!(
        &trace[4..],
        [
            SessionState::CheckSatisfaction,
            SessionState::Revise,
            SessionState::RequestFeedback,
            SessionState::CheckSatisfaction,
        ]
    );
}

#[tokio::test]
async fn test_generator_fails_while_drafting() {
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new()
            .then_respond("T")
            .then_respond("Q")
            .then_fail(GeneratorError::unavailable("connection refused")),
        ScriptedChannel::new(["Client: Acme, Amount: $500"]),
    );

    let err = controller.run().await.unwrap_err();

    assert!(matches!(
        err,
        DraftError::GenerationFailure {
            state: SessionState::Draft,
            source: GeneratorError::Unavailable { .. }
        }
    ));
    assert_eq!(err.exit_code(), 3);

    let session = controller.session();
    assert_eq!(session.template(), "T");
    assert!(session.document().is_empty());
    assert!(!session.is_satisfied());
    assert_eq!(controller.state(), SessionState::Draft);
}

#[tokio::test]
async fn test_channel_closes_while_gathering_info() {
    let (mut controller, generator, _) = controller(
        ScriptedGenerator::new().then_respond("T").then_respond("Q"),
        ScriptedChannel::closed(),
    );

    let err = controller.run().await.unwrap_err();

    assert!(matches!(
        err,
        DraftError::UserChannelFailure {
            state: SessionState::GatherInfo,
            source: ChannelError::Closed
        }
    ));
    assert_eq!(err.exit_code(), 4);

    let session = controller.session();
    assert_eq!(session.template(), "T");
    assert!(session.document().is_empty());
    assert!(!session.is_satisfied());
    assert_eq!(generator.call_count(), 2);

    // The question was recorded before the channel failed
    let last = session.last_entry().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.text, "Q");
}

#[tokio::test]
async fn test_rate_limit_is_reported_as_retryable() {
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new().then_fail(GeneratorError::RateLimited {
            message: "slow down".to_string(),
            retry_after_secs: 20,
        }),
        ScriptedChannel::closed(),
    );

    let err = controller.run().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.state(), Some(SessionState::Template));
    assert!(controller.session().template().is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_template_and_draft_precede_feedback() {
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new().with_fallback("text"),
        ScriptedChannel::new(["details", "shorter", "warmer", "good"]),
    );

    controller.run().await.unwrap();
    let trace = controller.trace();

    let template = position(trace, SessionState::Template);
    let draft = position(trace, SessionState::Draft);
    let feedback = position(trace, SessionState::RequestFeedback);
    assert!(template < draft);
    assert!(draft < feedback);

    // Template and Draft each run exactly once
    assert_eq!(
        trace.iter().filter(|s| **s == SessionState::Template).count(),
        1
    );
    assert_eq!(trace.iter().filter(|s| **s == SessionState::Draft).count(), 1);
}

#[tokio::test]
async fn test_satisfied_flips_once_and_stays() {
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new().with_fallback("text"),
        ScriptedChannel::new(["details", "needs a due date", "Good, thanks"]),
    );

    let mut observed = Vec::new();
    while !controller.state().is_terminal() {
        controller.step().await.unwrap();
        observed.push(controller.session().is_satisfied());
    }

    let first_true = observed.iter().position(|s| *s).unwrap();
    assert!(observed[..first_true].iter().all(|s| !s));
    assert!(observed[first_true..].iter().all(|s| *s));

    // Stepping a finished session changes nothing
    controller.step().await.unwrap();
    assert!(controller.session().is_satisfied());
}

#[tokio::test]
async fn test_feedback_history_tracks_revisions() {
    let replies = ["details", "one", "two", "three", "satisfied"];
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new().with_fallback("text"),
        ScriptedChannel::new(replies),
    );

    let mut last_len = 0;
    while !controller.state().is_terminal() {
        controller.step().await.unwrap();

        let revisions = controller
            .trace()
            .iter()
            .filter(|s| **s == SessionState::Revise)
            .count();
        let history = controller.session().feedback_history().len();
        assert_eq!(history, revisions);
        assert!(history >= last_len);
        last_len = history;
    }

    assert_eq!(
        controller.session().feedback_history(),
        ["one", "two", "three"]
    );
}

#[tokio::test]
async fn test_empty_reply_is_not_satisfaction() {
    let (mut controller, _, _) = controller(
        ScriptedGenerator::new().with_fallback("text"),
        ScriptedChannel::new(["", "", "satisfied"]),
    );

    let session = controller.run().await.unwrap();
    assert_eq!(session.feedback_history(), [""]);
}

#[tokio::test]
async fn test_configured_keywords_end_session() {
    let (controller, _, _) = controller(
        ScriptedGenerator::new().with_fallback("text"),
        ScriptedChannel::new(["details", "looks good", "APPROVED"]),
    );
    let mut controller = controller.with_predicate(KeywordPredicate::new(["approved"]));

    let session = controller.run().await.unwrap();
    assert!(session.is_satisfied());
    assert_eq!(session.feedback_history(), ["looks good"]);
}

#[test]
fn test_predicate_is_idempotent() {
    let predicate = KeywordPredicate::default();
    for text in ["looks good", "not satisfied", "more formal", "", "GOOD"] {
        let first = predicate.is_satisfied(text);
        assert_eq!(predicate.is_satisfied(text), first);
        assert_eq!(predicate.is_satisfied(text), first);
    }
}
