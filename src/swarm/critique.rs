//! Parsing of reviewer output into per-agent scores and a consensus score.
//!
//! Reviewer lines look like `agent-3: 0.85 | sharpened the failure analysis`
//! and the final line like `[CONSENSUS]: 0.91 | converging`. Parsing is
//! deliberately lenient: a missed line keeps the agent's prior confidence,
//! and a missing consensus falls back to the mean at the call site.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static SCORE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(agent-\d+)\s*:\s*(-?[0-9]*\.?[0-9]+)\s*(?:\|\s*(.*?))?\s*$").unwrap()
});

static CONSENSUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*\[?\s*consensus\s*\]?\s*:\s*(-?[0-9]*\.?[0-9]+)\s*(?:\|.*)?$").unwrap()
});

/// One reviewer judgement for one agent.
#[derive(Debug, Clone)]
pub struct AgentScore {
    pub score: f64,
    pub justification: Option<String>,
}

/// Parsed reviewer verdict.
#[derive(Debug, Clone, Default)]
pub struct ReviewerVerdict {
    /// agent id -> clamped new score.
    pub scores: HashMap<String, AgentScore>,
    /// Clamped consensus score, if the reviewer emitted one.
    pub consensus: Option<f64>,
}

/// Parse raw reviewer text.
pub fn parse_reviewer_output(raw: &str) -> ReviewerVerdict {
    let mut scores = HashMap::new();

    for caps in SCORE_LINE_RE.captures_iter(raw) {
        let agent_id = caps[1].to_lowercase();
        if let Ok(value) = caps[2].parse::<f64>() {
            scores.insert(
                agent_id,
                AgentScore {
                    score: value.clamp(0.0, 1.0),
                    justification: caps
                        .get(3)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|s| !s.is_empty()),
                },
            );
        }
    }

    let consensus = CONSENSUS_RE
        .captures(raw)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0));

    ReviewerVerdict { scores, consensus }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scores_and_consensus() {
        let raw = "agent-1: 0.95 | crisp and well-grounded\n\
                   agent-2: 0.40 | misses the constraint\n\
                   [CONSENSUS]: 0.82 | two camps remain";
        let verdict = parse_reviewer_output(raw);
        assert_eq!(verdict.scores.len(), 2);
        assert!((verdict.scores["agent-1"].score - 0.95).abs() < 1e-9);
        assert_eq!(
            verdict.scores["agent-2"].justification.as_deref(),
            Some("misses the constraint")
        );
        assert!((verdict.consensus.unwrap() - 0.82).abs() < 1e-9);
    }

    #[test]
    fn tolerates_missing_brackets_and_case() {
        let verdict = parse_reviewer_output("AGENT-3: 0.7\nConsensus: 0.50");
        assert!((verdict.scores["agent-3"].score - 0.7).abs() < 1e-9);
        assert!((verdict.consensus.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let verdict = parse_reviewer_output("agent-1: 1.8\n[CONSENSUS]: -0.3");
        assert!((verdict.scores["agent-1"].score - 1.0).abs() < 1e-9);
        assert!(verdict.consensus.unwrap().abs() < 1e-9);
    }

    #[test]
    fn unparseable_text_yields_empty_verdict() {
        let verdict = parse_reviewer_output("the agents seem fine to me");
        assert!(verdict.scores.is_empty());
        assert!(verdict.consensus.is_none());
    }

    #[test]
    fn ignores_prose_around_score_lines() {
        let raw = "Here is my review.\n\nagent-1: 0.6 | decent\n\nOverall:\n[CONSENSUS]: 0.6";
        let verdict = parse_reviewer_output(raw);
        assert_eq!(verdict.scores.len(), 1);
        assert!(verdict.consensus.is_some());
    }
}
