//! Prompt construction for agents, the reviewer, and synthesis.
//!
//! Domain logic for rendering swarm prompts. Provider-agnostic.

use std::collections::BTreeMap;

use crate::gateway::Message;

use super::types::AgentResponse;

/// Responses are truncated to this many characters in reviewer prompts.
pub const REVIEW_SNIPPET_CHARS: usize = 500;

const AGENT_SYSTEM: &str = "You are {agent_id}, one independent agent in a swarm analyzing a mission. \
Give your own opinionated answer; do not hedge toward a committee view. \
End your answer with a confidence tag on its own line in exactly this format: [CONFIDENCE: X.XX] \
where X.XX is between 0.00 and 1.00.";

const REVIEWER_SYSTEM: &str = "You are the swarm reviewer. You re-score each agent's answer for accuracy, \
depth, and relevance to the mission, and you estimate how close the swarm is to consensus. \
Output one line per agent in exactly this format:\n\
agent-id: NEW_SCORE | one-sentence justification\n\
with NEW_SCORE between 0.00 and 1.00. Finish with a final line:\n\
[CONSENSUS]: SCORE | short note";

const SYNTHESIS_SYSTEM: &str = "You are the synthesis engine for an agent swarm. You receive the mission and \
every agent's answer annotated with its posterior weight and confidence. \
Produce one coherent final answer. Weigh higher-weighted agents more heavily, \
reconcile conflicts explicitly, and do not mention the agents or the weighting.";

/// Per-agent fan-out prompt. Temperature jitter happens at the call site.
pub fn agent_messages(agent_id: &str, mission: &str) -> Vec<Message> {
    vec![
        Message::system(AGENT_SYSTEM.replace("{agent_id}", agent_id)),
        Message::user(mission),
    ]
}

/// Reviewer prompt over the current response set.
pub fn reviewer_messages(mission: &str, responses: &[AgentResponse]) -> Vec<Message> {
    let mut body = String::with_capacity(1_024);
    body.push_str("Mission:\n");
    body.push_str(mission);
    body.push_str("\n\nAgent answers:\n");
    for r in responses {
        body.push_str(&format!(
            "\n{} (confidence {:.2}):\n{}\n",
            r.agent_id,
            r.confidence,
            truncate_chars(&r.response, REVIEW_SNIPPET_CHARS)
        ));
    }
    vec![Message::system(REVIEWER_SYSTEM), Message::user(body)]
}

/// Synthesis prompt annotated with posterior weights.
pub fn synthesis_messages(
    mission: &str,
    responses: &[AgentResponse],
    weights: &BTreeMap<String, f64>,
) -> Vec<Message> {
    let mut body = String::with_capacity(2_048);
    body.push_str("Mission:\n");
    body.push_str(mission);
    body.push_str("\n\nAgent answers:\n");
    for r in responses {
        if r.error.is_some() || r.response.is_empty() {
            continue;
        }
        let weight = weights.get(&r.agent_id).copied().unwrap_or(0.0);
        body.push_str(&format!(
            "\n{} (Weight: {:.3}, Confidence: {:.2}):\n{}\n",
            r.agent_id, weight, r.confidence, r.response
        ));
    }
    body.push_str("\nWrite the synthesized answer.");
    vec![Message::system(SYNTHESIS_SYSTEM), Message::user(body)]
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::types::TokenUsage;

    fn response(id: &str, text: &str, confidence: f64) -> AgentResponse {
        AgentResponse {
            agent_id: id.to_string(),
            model: "m".to_string(),
            response: text.to_string(),
            confidence,
            latency_ms: 10,
            tokens: TokenUsage::default(),
            error: None,
        }
    }

    #[test]
    fn agent_prompt_names_the_agent_and_the_tag() {
        let msgs = agent_messages("agent-3", "find the root cause");
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].content.contains("agent-3"));
        assert!(msgs[0].content.contains("[CONFIDENCE: X.XX]"));
        assert_eq!(msgs[1].content, "find the root cause");
    }

    #[test]
    fn reviewer_prompt_truncates_long_responses() {
        let long = "x".repeat(2_000);
        let msgs = reviewer_messages("m", &[response("agent-1", &long, 0.6)]);
        let body = &msgs[1].content;
        assert!(body.contains("agent-1"));
        assert!(body.chars().count() < 1_000);
        assert!(body.contains('…'));
    }

    #[test]
    fn synthesis_prompt_annotates_weights_and_skips_errors() {
        let mut errored = response("agent-2", "", 0.0);
        errored.error = Some("boom".to_string());
        let mut weights = BTreeMap::new();
        weights.insert("agent-1".to_string(), 1.0);

        let msgs = synthesis_messages("m", &[response("agent-1", "answer", 0.9), errored], &weights);
        let body = &msgs[1].content;
        assert!(body.contains("(Weight: 1.000, Confidence: 0.90)"));
        assert!(!body.contains("agent-2"));
    }
}
