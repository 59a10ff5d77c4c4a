//! Parsing of the trailing `[CONFIDENCE: X.XX]` tag in agent output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Confidence assumed when the tag is absent or unparseable.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\s*confidence\s*:\s*(-?[0-9]*\.?[0-9]+)\s*\]").unwrap());

/// Extract the confidence tag from raw model output.
///
/// Returns the response text with the tag stripped, and the parsed value
/// clamped to [0, 1]. A missing or malformed tag never fails the mission;
/// it yields [`DEFAULT_CONFIDENCE`].
pub fn parse_confidence(raw: &str) -> (String, f64) {
    match CONFIDENCE_RE.captures(raw) {
        Some(caps) => {
            let confidence = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(DEFAULT_CONFIDENCE);
            let stripped = CONFIDENCE_RE.replace_all(raw, "").trim().to_string();
            (stripped, confidence)
        }
        None => (raw.trim().to_string(), DEFAULT_CONFIDENCE),
    }
}
