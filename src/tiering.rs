//! Request tiering: trivially-handled tasks vs swarm-worthy missions.
//!
//! `classify` is a pure function over the mission text. Task-tier requests
//! run a local zero-cost handler; mission-tier requests invoke the swarm.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Execution tier for an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Task,
    Mission,
}

/// Local handler assigned to task-tier requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalHandler {
    TextCleaner,
    Whitespace,
    CaseTransform,
    Counter,
    Identity,
}

/// Classification result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub tier: Tier,
    pub confidence: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_handler: Option<LocalHandler>,
}

// Simple-task patterns, each mapped to a handler.
static CLEAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:clean|fix)(?:\s+up)?\s+(?:the\s+)?(?:text|spelling|typos|quotes)\b")
        .unwrap()
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:collapse|normalize|trim|strip)\s+(?:extra\s+)?(?:the\s+)?whitespace\b")
        .unwrap()
});
static CASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:upper|lower|sentence)\s*-?\s*case\b|(?i)\bcapitali[sz]e\b").unwrap()
});
static COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bcount\s+(?:the\s+)?(?:words?|chars?|characters|lines)\b").unwrap()
});
static CONVERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:sort\s+(?:the\s+)?lines|extract\s+(?:all\s+)?(?:emails?|numbers?|urls?|links?)|convert\s+(?:to|into))\b")
        .unwrap()
});

static SIMPLE_TASKS: Lazy<Vec<(&'static Regex, LocalHandler)>> = Lazy::new(|| {
    vec![
        (&CLEAN_RE, LocalHandler::TextCleaner),
        (&WHITESPACE_RE, LocalHandler::Whitespace),
        (&CASE_RE, LocalHandler::CaseTransform),
        (&COUNT_RE, LocalHandler::Counter),
        (&CONVERT_RE, LocalHandler::Identity),
    ]
});

/// Fixed vocabulary of mission indicators, matched on word boundaries.
static MISSION_INDICATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:analy[sz]e|synthesi[sz]e|design|evaluate|compare|research|investigate|architect|strateg(?:y|i[sz]e)|optimi[sz]e|assess|recommend|brainstorm|critique|forecast)\b",
    )
    .unwrap()
});

/// Classify a request into task or mission tier.
///
/// Rules apply in order; the first match wins.
pub fn classify(mission: &str) -> Classification {
    let word_count = mission.split_whitespace().count();
    let char_count = mission.chars().count();

    // 1. Simple task patterns.
    for (regex, handler) in SIMPLE_TASKS.iter() {
        if regex.is_match(mission) {
            return Classification {
                tier: Tier::Task,
                confidence: 0.95,
                reason: "matches a simple task pattern".to_string(),
                local_handler: Some(*handler),
            };
        }
    }

    // 2. Very short inputs are tasks.
    if word_count < 5 && char_count < 40 {
        return Classification {
            tier: Tier::Task,
            confidence: 0.7,
            reason: format!("short input ({word_count} words, {char_count} chars)"),
            local_handler: Some(LocalHandler::Identity),
        };
    }

    // 3. Mission-indicator vocabulary.
    let indicators = MISSION_INDICATOR_RE.find_iter(mission).count();
    if indicators >= 2 {
        return Classification {
            tier: Tier::Mission,
            confidence: 0.9,
            reason: format!("{indicators} mission indicators present"),
            local_handler: None,
        };
    }
    if indicators == 1 && word_count >= 15 {
        return Classification {
            tier: Tier::Mission,
            confidence: 0.8,
            reason: "one mission indicator in a substantial request".to_string(),
            local_handler: None,
        };
    }

    // 4. Long inputs default to mission.
    if word_count >= 15 || char_count >= 80 {
        return Classification {
            tier: Tier::Mission,
            confidence: 0.75,
            reason: format!("long input ({word_count} words, {char_count} chars)"),
            local_handler: None,
        };
    }

    // 5. Fallback.
    Classification {
        tier: Tier::Task,
        confidence: 0.6,
        reason: "no mission signal detected".to_string(),
        local_handler: Some(LocalHandler::Identity),
    }
}

// =============================================================================
// Local task handlers
// =============================================================================

/// Run a local handler over the auxiliary content.
///
/// The mission text steers mode selection (e.g. upper vs lower case); the
/// transformation applies to `content`.
pub fn run_handler(handler: LocalHandler, mission: &str, content: &str) -> String {
    match handler {
        LocalHandler::TextCleaner => text_cleaner(content),
        LocalHandler::Whitespace => collapse_whitespace(content),
        LocalHandler::CaseTransform => case_transform(mission, content),
        LocalHandler::Counter => counter(content),
        LocalHandler::Identity => content.to_string(),
    }
}

/// Collapse whitespace runs and normalize curly quotes.
fn text_cleaner(content: &str) -> String {
    let collapsed = collapse_whitespace(content);
    collapsed
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

fn collapse_whitespace(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn case_transform(mission: &str, content: &str) -> String {
    let lower_mission = mission.to_lowercase();
    if lower_mission.contains("upper") {
        content.to_uppercase()
    } else if lower_mission.contains("lower") {
        content.to_lowercase()
    } else {
        sentence_case(content)
    }
}

/// Uppercase the first letter of each sentence, lowercase the rest.
fn sentence_case(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut start_of_sentence = true;
    for c in content.chars() {
        if start_of_sentence && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            start_of_sentence = false;
        } else {
            out.extend(c.to_lowercase());
            if matches!(c, '.' | '!' | '?') {
                start_of_sentence = true;
            }
        }
    }
    out
}

fn counter(content: &str) -> String {
    let words = content.split_whitespace().count();
    let chars = content.chars().count();
    let lines = if content.is_empty() {
        0
    } else {
        content.lines().count()
    };
    format!("{words} words, {chars} characters, {lines} lines")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_spelling_is_a_task() {
        let c = classify("clean spelling");
        assert_eq!(c.tier, Tier::Task);
        assert!((c.confidence - 0.95).abs() < 1e-9);
        assert_eq!(c.local_handler, Some(LocalHandler::TextCleaner));
    }

    #[test]
    fn short_input_is_a_task() {
        let c = classify("hello there");
        assert_eq!(c.tier, Tier::Task);
        assert!((c.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn two_indicators_make_a_mission() {
        let c = classify("analyze the market and design a rollout");
        assert_eq!(c.tier, Tier::Mission);
        assert!((c.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn one_indicator_with_length_makes_a_mission() {
        let c = classify(
            "please research the trade-offs between the two storage engines we discussed \
             last week and tell me which one fits",
        );
        assert_eq!(c.tier, Tier::Mission);
        assert!((c.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn long_input_without_indicators_is_a_mission() {
        let c = classify(
            "we keep seeing intermittent timeouts in the payments path whenever the \
             upstream cache is cold and I want to know why",
        );
        assert_eq!(c.tier, Tier::Mission);
        assert!((c.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn fallback_is_a_low_confidence_task() {
        let c = classify("what time is it in tokyo now");
        assert_eq!(c.tier, Tier::Task);
        assert!((c.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn classify_is_pure() {
        let a = classify("analyze and compare these options carefully");
        let b = classify("analyze and compare these options carefully");
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.reason, b.reason);
    }

    #[test]
    fn text_cleaner_normalizes_quotes_and_whitespace() {
        let out = run_handler(
            LocalHandler::TextCleaner,
            "clean the text",
            "it\u{2019}s   \u{201C}fine\u{201D}\n\treally",
        );
        assert_eq!(out, "it's \"fine\" really");
    }

    #[test]
    fn case_transform_modes() {
        assert_eq!(
            run_handler(LocalHandler::CaseTransform, "uppercase this", "abc"),
            "ABC"
        );
        assert_eq!(
            run_handler(LocalHandler::CaseTransform, "lowercase this", "ABC"),
            "abc"
        );
        assert_eq!(
            run_handler(
                LocalHandler::CaseTransform,
                "sentence case this",
                "hello. WORLD! ok"
            ),
            "Hello. World! Ok"
        );
    }

    #[test]
    fn counter_counts() {
        let out = run_handler(LocalHandler::Counter, "count words", "one two\nthree");
        assert_eq!(out, "3 words, 13 characters, 2 lines");
    }

    #[test]
    fn identity_passes_through() {
        let out = run_handler(LocalHandler::Identity, "whatever", "unchanged");
        assert_eq!(out, "unchanged");
    }
}
