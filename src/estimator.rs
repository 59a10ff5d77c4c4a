//! Pre-flight cost estimation and budget check.
//!
//! Pure token-heuristic arithmetic over the pricing registry. No API calls.

use serde::Serialize;

use crate::gateway::pricing::{chat_cost, nanos_to_usd};

/// Expected output tokens per swarm agent.
pub const EXPECTED_OUTPUT_TOKENS: u32 = 500;

/// Modeled output tokens for the synthesis call.
pub const SYNTHESIS_OUTPUT_TOKENS: u32 = 1_000;

/// Cost estimate for a mission. Costs in nanodollars.
#[derive(Debug, Clone, Copy)]
pub struct CostEstimate {
    pub input_tokens: u32,
    pub expected_output_tokens: u32,
    pub swarm_cost_nanos: i64,
    pub synthesis_cost_nanos: i64,
    pub total_cost_nanos: i64,
    pub within_budget: bool,
}

impl CostEstimate {
    pub fn total_usd(&self) -> f64 {
        nanos_to_usd(self.total_cost_nanos)
    }
}

/// Boundary-facing estimate with costs in USD.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimateBody {
    pub input_tokens: u32,
    pub expected_output_tokens: u32,
    pub swarm_cost: f64,
    pub synthesis_cost: f64,
    pub total_cost: f64,
    pub within_budget: bool,
}

impl From<&CostEstimate> for CostEstimateBody {
    fn from(e: &CostEstimate) -> Self {
        Self {
            input_tokens: e.input_tokens,
            expected_output_tokens: e.expected_output_tokens,
            swarm_cost: nanos_to_usd(e.swarm_cost_nanos),
            synthesis_cost: nanos_to_usd(e.synthesis_cost_nanos),
            total_cost: nanos_to_usd(e.total_cost_nanos),
            within_budget: e.within_budget,
        }
    }
}

/// Heuristic token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// Estimate the cost of running a mission through the swarm.
///
/// Each agent sees the full mission and is expected to produce
/// [`EXPECTED_OUTPUT_TOKENS`]. Synthesis reads the mission plus every agent's
/// expected output and produces [`SYNTHESIS_OUTPUT_TOKENS`].
pub fn estimate_mission_cost(
    mission: &str,
    swarm_size: usize,
    swarm_model: &str,
    synthesis_model: &str,
    max_budget_nanos: i64,
) -> CostEstimate {
    let input_tokens = estimate_tokens(mission);

    let per_agent = chat_cost(swarm_model, input_tokens, EXPECTED_OUTPUT_TOKENS);
    let swarm_cost_nanos = per_agent.saturating_mul(swarm_size as i64);

    let synthesis_input = input_tokens + swarm_size as u32 * EXPECTED_OUTPUT_TOKENS;
    let synthesis_cost_nanos = chat_cost(synthesis_model, synthesis_input, SYNTHESIS_OUTPUT_TOKENS);

    let total_cost_nanos = swarm_cost_nanos.saturating_add(synthesis_cost_nanos);

    CostEstimate {
        input_tokens,
        expected_output_tokens: EXPECTED_OUTPUT_TOKENS,
        swarm_cost_nanos,
        synthesis_cost_nanos,
        total_cost_nanos,
        within_budget: total_cost_nanos <= max_budget_nanos,
    }
}
