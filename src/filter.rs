//! Abuse and silent-ignore filters
//!
//! Two filter layers run before any outbound call is made. The abuse
//! filter rejects mass-mention patterns the downstream chat platform would
//! expand, and terminates the request with an error. The silent-ignore
//! layer accepts-and-drops low-value reports: the sender receives a
//! success response, but nothing is forwarded.

use crate::error::{Error, Result};
use crate::feedback::{CompleteFeedback, Feedback};
use regex::Regex;

/// Mention patterns that must never reach the chat platform
const FORBIDDEN_PATTERNS: [&str; 3] = ["@everyone", "@here", "<@"];

/// Case-sensitive scan for mention patterns
pub fn contains_forbidden(input: &str) -> bool {
    FORBIDDEN_PATTERNS.iter().any(|p| input.contains(p))
}

/// Scan the four required fields of a validated report.
///
/// `reporter` and `exception` are deliberately not scanned here; a
/// mention pattern in those merely drops the annotation from the outbound
/// payload instead of rejecting the whole report.
pub fn has_forbidden_field(report: &CompleteFeedback<'_>) -> bool {
    contains_forbidden(report.content)
        || contains_forbidden(report.name)
        || contains_forbidden(report.version)
        || contains_forbidden(report.dhash)
}

/// A single ignore test.
///
/// Tests come in three shapes, mirroring the kinds of junk reports seen in
/// practice. `Substring` and `Pattern` look at the reporter field only;
/// `Predicate` receives the whole report for anything more involved.
pub enum IgnoreTest {
    /// Case-insensitive substring match against the reporter
    Substring(String),
    /// Regex match against the raw reporter
    Pattern(Regex),
    /// Arbitrary predicate over the whole report
    Predicate(fn(&Feedback) -> bool),
}

impl IgnoreTest {
    /// Evaluate one test against a report.
    ///
    /// Reporter-based tests never match when the reporter is absent.
    fn matches(&self, feedback: &Feedback) -> bool {
        let reporter = feedback.reporter.as_deref();
        match self {
            IgnoreTest::Substring(needle) => reporter
                .map(|r| r.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
            IgnoreTest::Pattern(re) => reporter.map(|r| re.is_match(r)).unwrap_or(false),
            IgnoreTest::Predicate(test) => test(feedback),
        }
    }
}

impl std::fmt::Debug for IgnoreTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreTest::Substring(s) => f.debug_tuple("Substring").field(s).finish(),
            IgnoreTest::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            IgnoreTest::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

/// A conjunction of ignore tests: the set is satisfied only when every
/// member test matches.
#[derive(Debug)]
pub struct IgnoreSet {
    /// Member tests, all of which must match
    pub tests: Vec<IgnoreTest>,
}

impl IgnoreSet {
    /// Build a set from tests
    pub fn new(tests: Vec<IgnoreTest>) -> Self {
        Self { tests }
    }

    /// Single-test convenience constructor
    pub fn single(test: IgnoreTest) -> Self {
        Self { tests: vec![test] }
    }

    /// True when every member test matches. An empty set never matches.
    fn matches(&self, feedback: &Feedback) -> bool {
        !self.tests.is_empty() && self.tests.iter().all(|t| t.matches(feedback))
    }
}

/// The default ignore rules: reporters that carry no usable contact
/// information and read as throwaway input.
pub fn default_ignore_sets() -> Result<Vec<IgnoreSet>> {
    let pattern = |p: &str| -> Result<IgnoreTest> {
        Ok(IgnoreTest::Pattern(Regex::new(p).map_err(|e| {
            Error::Config(format!("Failed to compile ignore pattern {p:?}: {e}"))
        })?))
    };

    Ok(vec![
        // "this is just some feedback" and friends
        IgnoreSet::new(vec![
            IgnoreTest::Substring("just".to_string()),
            IgnoreTest::Substring("feedback".to_string()),
        ]),
        // exactly "feedback"
        IgnoreSet::single(pattern(r"(?i)^\s*feedback\s*$")?),
        // ".", "...", etc
        IgnoreSet::single(pattern(r"^\s*\.+\s*$")?),
        // "na", "-na", "n/a", "-n/a-", etc
        IgnoreSet::single(pattern(r"(?i)^\s*-?n/?a-?\s*$")?),
    ])
}

/// OR across sets: the report is dropped when any set is satisfied.
pub fn is_silently_ignored(feedback: &Feedback, sets: &[IgnoreSet]) -> bool {
    sets.iter().any(|set| set.matches(feedback))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_reporter(reporter: &str) -> Feedback {
        Feedback {
            content: Some("something broke".to_string()),
            name: Some("MyPlugin".to_string()),
            version: Some("1.0.0".to_string()),
            dhash: Some("abcd1234".to_string()),
            reporter: Some(reporter.to_string()),
            exception: None,
        }
    }

    fn ignored(reporter: &str) -> bool {
        is_silently_ignored(&with_reporter(reporter), &default_ignore_sets().unwrap())
    }

    #[test]
    fn test_forbidden_patterns() {
        assert!(contains_forbidden("hello @everyone"));
        assert!(contains_forbidden("@here now"));
        assert!(contains_forbidden("ping <@1234>"));
        assert!(!contains_forbidden("plain text"));
        // case-sensitive by design
        assert!(!contains_forbidden("@EVERYONE"));
    }

    #[test]
    fn test_forbidden_fields_scanned() {
        let mut feedback = with_reporter("user@example.com");
        feedback.content = Some("hey @here".to_string());
        let report = feedback.require_complete().unwrap();
        assert!(has_forbidden_field(&report));
    }

    #[test]
    fn test_forbidden_skips_optional_fields() {
        let mut feedback = with_reporter("<@99999>");
        feedback.exception = Some("@everyone".to_string());
        let report = feedback.require_complete().unwrap();
        assert!(!has_forbidden_field(&report));
    }

    #[test]
    fn test_default_rules_exact_feedback() {
        assert!(ignored("feedback"));
        assert!(ignored("FEEDBACK"));
        assert!(ignored("  Feedback  "));
        assert!(!ignored("feedback form"));
    }

    #[test]
    fn test_default_rules_dots() {
        assert!(ignored("."));
        assert!(ignored("..."));
        assert!(ignored("  ..  "));
        assert!(!ignored(".name"));
    }

    #[test]
    fn test_default_rules_na_variants() {
        for reporter in ["na", "NA", "n/a", "N/A", "-na", "n/a-", "-n/a-", " n/a "] {
            assert!(ignored(reporter), "expected {reporter:?} to be ignored");
        }
        assert!(!ignored("nathan"));
        assert!(!ignored("banana"));
    }

    #[test]
    fn test_default_rules_just_feedback_conjunction() {
        assert!(ignored("just feedback"));
        assert!(ignored("this is Just some FEEDBACK"));
        // both substrings are required
        assert!(!ignored("just testing"));
        assert!(!ignored("some feedback here"));
    }

    #[test]
    fn test_real_contact_not_ignored() {
        assert!(!ignored("user@example.com"));
        assert!(!ignored("Discord: someone#1234"));
    }

    #[test]
    fn test_absent_reporter_not_ignored() {
        let mut feedback = with_reporter("x");
        feedback.reporter = None;
        assert!(!is_silently_ignored(
            &feedback,
            &default_ignore_sets().unwrap()
        ));
    }

    #[test]
    fn test_predicate_sees_whole_report() {
        let sets = vec![IgnoreSet::single(IgnoreTest::Predicate(|fb| {
            fb.content.as_deref() == Some("drop me")
        }))];
        let mut feedback = with_reporter("user@example.com");
        assert!(!is_silently_ignored(&feedback, &sets));
        feedback.content = Some("drop me".to_string());
        assert!(is_silently_ignored(&feedback, &sets));
    }

    #[test]
    fn test_empty_set_never_matches() {
        let sets = vec![IgnoreSet::new(Vec::new())];
        assert!(!is_silently_ignored(&with_reporter("anyone"), &sets));
    }
}
