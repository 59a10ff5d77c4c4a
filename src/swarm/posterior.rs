//! Bayesian posterior weight computation over agent responses.
//!
//! Confidence carries most of the weight; a latency factor nudges faster
//! agents up slightly. Weights sum to 1 over qualifying responses.

use std::collections::BTreeMap;

use super::types::AgentResponse;

/// Compute posterior weights for synthesis.
///
/// Only non-errored responses with confidence > 0 qualify; returns an empty
/// map when none do.
pub fn compute_posterior_weights(responses: &[AgentResponse]) -> BTreeMap<String, f64> {
    let qualifying: Vec<&AgentResponse> = responses
        .iter()
        .filter(|r| r.error.is_none() && r.confidence > 0.0)
        .collect();

    let confidence_sum: f64 = qualifying.iter().map(|r| r.confidence).sum();
    if qualifying.is_empty() || confidence_sum <= 0.0 {
        return BTreeMap::new();
    }

    let mut raw: Vec<(String, f64)> = qualifying
        .iter()
        .map(|r| {
            let base = r.confidence / confidence_sum;
            let latency_factor = 1.0 / (1.0 + r.latency_ms as f64 / 10_000.0);
            (r.agent_id.clone(), base * (0.8 + 0.2 * latency_factor))
        })
        .collect();

    let total: f64 = raw.iter().map(|(_, w)| w).sum();
    let mut weights = BTreeMap::new();
    for (id, w) in raw.drain(..) {
        weights.insert(id, w / total);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::types::TokenUsage;

    fn response(id: &str, confidence: f64, latency_ms: u64, error: Option<&str>) -> AgentResponse {
        AgentResponse {
            agent_id: id.to_string(),
            model: "m".to_string(),
            response: "r".to_string(),
            confidence,
            latency_ms,
            tokens: TokenUsage::default(),
            error: error.map(|e| e.to_string()),
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let responses = vec![
            response("agent-1", 0.9, 800, None),
            response("agent-2", 0.5, 3_000, None),
            response("agent-3", 0.7, 15_000, None),
        ];
        let weights = compute_posterior_weights(&responses);
        let sum: f64 = weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(weights.len(), 3);
    }

    #[test]
    fn higher_confidence_wins() {
        let responses = vec![
            response("agent-1", 0.9, 1_000, None),
            response("agent-2", 0.3, 1_000, None),
        ];
        let weights = compute_posterior_weights(&responses);
        assert!(weights["agent-1"] > weights["agent-2"]);
    }

    #[test]
    fn faster_agent_wins_at_equal_confidence() {
        let responses = vec![
            response("agent-1", 0.7, 500, None),
            response("agent-2", 0.7, 20_000, None),
        ];
        let weights = compute_posterior_weights(&responses);
        assert!(weights["agent-1"] > weights["agent-2"]);
    }

    #[test]
    fn errored_and_zero_confidence_excluded() {
        let responses = vec![
            response("agent-1", 0.7, 1_000, None),
            response("agent-2", 0.9, 1_000, Some("timeout")),
            response("agent-3", 0.0, 1_000, None),
        ];
        let weights = compute_posterior_weights(&responses);
        assert_eq!(weights.len(), 1);
        assert!((weights["agent-1"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_qualifying_responses_yields_empty() {
        let responses = vec![
            response("agent-1", 0.0, 1_000, None),
            response("agent-2", 0.5, 1_000, Some("boom")),
        ];
        assert!(compute_posterior_weights(&responses).is_empty());
    }

    #[test]
    fn permutation_equivariant() {
        let a = vec![
            response("agent-1", 0.9, 800, None),
            response("agent-2", 0.5, 3_000, None),
        ];
        let b = vec![a[1].clone(), a[0].clone()];
        let wa = compute_posterior_weights(&a);
        let wb = compute_posterior_weights(&b);
        assert!((wa["agent-1"] - wb["agent-1"]).abs() < 1e-12);
        assert!((wa["agent-2"] - wb["agent-2"]).abs() < 1e-12);
    }
}
