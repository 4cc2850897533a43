//! Termination predicate for the feedback loop.
//!
//! The default, [`KeywordPredicate`], is a deliberately crude heuristic: a
//! case-insensitive substring match of `"satisfied"` or `"good"` against the
//! latest user reply. It will happily accept "not good at all". Swap in a
//! stricter classifier through [`SatisfactionPredicate`] when that matters;
//! the state machine does not care how the decision is made.

/// Decides whether the user is done, given their latest reply.
///
/// Implementations must be pure: the same text always yields the same
/// answer. Any `Fn(&str) -> bool + Send + Sync` closure qualifies.
pub trait SatisfactionPredicate: Send + Sync {
    fn is_satisfied(&self, latest_user_text: &str) -> bool;
}

impl<F> SatisfactionPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_satisfied(&self, latest_user_text: &str) -> bool {
        self(latest_user_text)
    }
}

/// Keywords accepted by the default predicate.
pub const DEFAULT_KEYWORDS: &[&str] = &["satisfied", "good"];

/// Case-insensitive substring match against a keyword list.
///
/// # Example
///
/// ```
/// use draftloop::session::{KeywordPredicate, SatisfactionPredicate};
///
/// let predicate = KeywordPredicate::default();
/// assert!(predicate.is_satisfied("Looks GOOD to me"));
/// assert!(!predicate.is_satisfied("make it more formal"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPredicate {
    keywords: Vec<String>,
}

impl KeywordPredicate {
    /// Predicate over custom keywords. Blank keywords are dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

impl SatisfactionPredicate for KeywordPredicate {
    fn is_satisfied(&self, latest_user_text: &str) -> bool {
        let text = latest_user_text.to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords() {
        let predicate = KeywordPredicate::default();
        assert!(predicate.is_satisfied("looks good"));
        assert!(predicate.is_satisfied("I'm SATISFIED"));
        assert!(predicate.is_satisfied("Good."));
        assert!(!predicate.is_satisfied("make it more formal"));
        assert!(!predicate.is_satisfied(""));
    }

    #[test]
    fn test_substring_match_is_crude() {
        // Known false positives of the heuristic
        let predicate = KeywordPredicate::default();
        assert!(predicate.is_satisfied("not good at all"));
        assert!(predicate.is_satisfied("goodness, no"));
        assert!(predicate.is_satisfied("dissatisfied"));
    }

    #[test]
    fn test_idempotent() {
        let predicate = KeywordPredicate::default();
        for text in ["looks good", "needs work", "Satisfied!", ""] {
            assert_eq!(predicate.is_satisfied(text), predicate.is_satisfied(text));
        }
    }

    #[test]
    fn test_custom_keywords_normalized() {
        let predicate = KeywordPredicate::new(["  Approved ", "", "LGTM"]);
        assert_eq!(predicate.keywords(), ["approved", "lgtm"]);
        assert!(predicate.is_satisfied("approved, ship it"));
        assert!(predicate.is_satisfied("lgtm"));
        assert!(!predicate.is_satisfied("looks good"));
    }

    #[test]
    fn test_closure_predicate() {
        let strict = |text: &str| text.trim().eq_ignore_ascii_case("done");
        assert!(strict.is_satisfied(" DONE "));
        assert!(!strict.is_satisfied("not done"));
    }
}
