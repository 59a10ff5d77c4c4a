//! Red-team content scanning and sanitization using regex patterns.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity tier of a red-team flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Where the scanned content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSource {
    Input,
    Output,
    Synthesis,
}

/// A single red-team finding. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedTeamFlag {
    pub flag_id: Uuid,
    pub severity: Severity,
    pub categories: Vec<String>,
    pub explanation: String,
    pub source: FlagSource,
    /// The matched substring.
    pub content: String,
}

/// One labeled detection pattern.
struct PatternSpec {
    categories: &'static [&'static str],
    severity: Severity,
    explanation: &'static str,
    regex: &'static Regex,
}

// Compiled regex patterns (compiled once, reused). All case-insensitive.
static WEAPON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:make|build|create|construct|assemble)\s+(?:a\s+|an\s+)?(?:bomb|explosive|pipe bomb|weapon|nerve agent)\b")
        .unwrap()
});
static VIOLENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:kill|murder|maim|torture)\s+(?:someone|somebody|people|him|her|them|a person)\b")
        .unwrap()
});
static ILLEGAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:how\s+to\s+(?:hack|break)\s+into|synthesi[sz]e\s+(?:meth|methamphetamine|fentanyl)|launder\s+money|counterfeit\s+(?:money|currency))\b")
        .unwrap()
});
static PII_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:\d{3}-\d{2}-\d{4}|(?:\d{4}[-\s]?){3}\d{4})\b").unwrap()
});
static MANIPULATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:gaslight(?:ing)?|psychologically\s+manipulate|coerce\s+(?:someone|him|her|them)|blackmail)\b")
        .unwrap()
});
static SELF_HARM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:kill\s+myself|end\s+my\s+life|suicide\s+method|self[\s-]?harm)\b")
        .unwrap()
});
static CSAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:child\s+(?:sexual|porn)|csam|minor(?:s)?\s+(?:sexual|explicit))\b")
        .unwrap()
});

static PATTERNS: Lazy<Vec<PatternSpec>> = Lazy::new(|| {
    vec![
        PatternSpec {
            categories: &["violence", "illegal"],
            severity: Severity::Critical,
            explanation: "Instructions for constructing weapons or explosives",
            regex: &WEAPON_RE,
        },
        PatternSpec {
            categories: &["violence"],
            severity: Severity::High,
            explanation: "Content describing violence against people",
            regex: &VIOLENCE_RE,
        },
        PatternSpec {
            categories: &["illegal"],
            severity: Severity::High,
            explanation: "Content soliciting illegal activity",
            regex: &ILLEGAL_RE,
        },
        PatternSpec {
            categories: &["pii"],
            severity: Severity::Medium,
            explanation: "Content containing personally identifiable numbers",
            regex: &PII_RE,
        },
        PatternSpec {
            categories: &["manipulation"],
            severity: Severity::Medium,
            explanation: "Content describing psychological manipulation of others",
            regex: &MANIPULATION_RE,
        },
        PatternSpec {
            categories: &["self-harm"],
            severity: Severity::Critical,
            explanation: "Content referencing self-harm",
            regex: &SELF_HARM_RE,
        },
        PatternSpec {
            categories: &["csam"],
            severity: Severity::Critical,
            explanation: "Content referencing sexual exploitation of minors",
            regex: &CSAM_RE,
        },
    ]
});

/// Scan content against the full pattern set.
///
/// Overlapping matches each produce an independent flag.
pub fn scan(content: &str, source: FlagSource) -> Vec<RedTeamFlag> {
    let mut flags = Vec::new();

    for spec in PATTERNS.iter() {
        for m in spec.regex.find_iter(content) {
            flags.push(RedTeamFlag {
                flag_id: Uuid::new_v4(),
                severity: spec.severity,
                categories: spec.categories.iter().map(|c| c.to_string()).collect(),
                explanation: spec.explanation.to_string(),
                source,
                content: m.as_str().to_string(),
            });
        }
    }

    flags
}

/// The most severe tier among the given flags.
pub fn highest_severity(flags: &[RedTeamFlag]) -> Option<Severity> {
    flags.iter().map(|f| f.severity).max()
}

/// Whether any flag is severe enough to block the mission.
pub fn should_block(flags: &[RedTeamFlag]) -> bool {
    flags
        .iter()
        .any(|f| f.severity >= Severity::High)
}

// =============================================================================
// Sanitization
// =============================================================================

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d{4}[-\s]?){3}\d{4}\b").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap());

/// Redact PII patterns with tagged placeholders before persistence.
///
/// Idempotent: placeholders contain no digits or `@`, so a second pass is a
/// no-op.
pub fn sanitize(text: &str) -> String {
    // Card before phone: a 16-digit run would otherwise partially match the
    // phone pattern. SSN before phone for the same reason.
    let text = SSN_RE.replace_all(text, "[REDACTED-SSN]");
    let text = CARD_RE.replace_all(&text, "[REDACTED-CARD]");
    let text = EMAIL_RE.replace_all(&text, "[REDACTED-EMAIL]");
    let text = PHONE_RE.replace_all(&text, "[REDACTED-PHONE]");
    text.into_owned()
}
