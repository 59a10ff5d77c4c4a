//! Data model for missions, traces, and in-flight swarm status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::safety::RedTeamFlag;

// =============================================================================
// Agent responses and iterations
// =============================================================================

/// Token counts for one upstream call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

/// One agent's answer for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub agent_id: String,
    pub model: String,
    pub response: String,
    /// Parsed from the trailing confidence tag; clamped to [0, 1].
    pub confidence: f64,
    pub latency_ms: u64,
    pub tokens: TokenUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One critique round (or the initial fan-out when critique is skipped).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    /// 1-based; equals its index in `Trace::iterations` plus one.
    pub iteration_id: usize,
    pub agent_responses: Vec<AgentResponse>,
    pub consensus_score: f64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Trace
// =============================================================================

/// Persisted lifecycle status of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TraceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceStatus::Completed | TraceStatus::Failed)
    }
}

/// The complete persisted record of one mission's lifecycle.
///
/// Owned exclusively by the trace store once saved; costs are USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub trace_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Sanitized mission text.
    pub mission: String,
    pub iterations: Vec<Iteration>,
    /// Declared for forward compatibility; nothing populates it.
    pub branch_scores: BTreeMap<String, f64>,
    pub red_team_flags: Vec<RedTeamFlag>,
    /// agent id -> weight; sums to 1 when non-empty.
    pub final_posterior_weights: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_result: Option<String>,
    pub cost_estimate: f64,
    pub actual_cost: f64,
    pub duration_ms: u64,
    pub status: TraceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Trace {
    /// Fresh trace at mission entry.
    pub fn new(mission: impl Into<String>, cost_estimate: f64) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mission: mission.into(),
            iterations: Vec::new(),
            branch_scores: BTreeMap::new(),
            red_team_flags: Vec::new(),
            final_posterior_weights: BTreeMap::new(),
            synthesis_result: None,
            cost_estimate,
            actual_cost: 0.0,
            duration_ms: 0,
            status: TraceStatus::Running,
            error: None,
        }
    }
}

// =============================================================================
// Ephemeral swarm status
// =============================================================================

/// In-flight phase of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwarmPhase {
    Pending,
    Running,
    Synthesizing,
    Completed,
    Failed,
}

impl SwarmPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwarmPhase::Completed | SwarmPhase::Failed)
    }
}

/// In-flight state of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Status entry for one agent in the swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub id: String,
    pub status: AgentState,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Ephemeral mission progress, retained briefly after terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmStatus {
    pub trace_id: Uuid,
    pub status: SwarmPhase,
    pub agents: Vec<AgentStatus>,
    pub current_iteration: usize,
    /// 0..=100
    pub progress: u8,
    pub message: String,
}

impl SwarmStatus {
    /// Initial status with one pending entry per agent.
    pub fn pending(trace_id: Uuid, swarm_size: usize, model: &str) -> Self {
        Self {
            trace_id,
            status: SwarmPhase::Pending,
            agents: (1..=swarm_size)
                .map(|i| AgentStatus {
                    id: format!("agent-{i}"),
                    status: AgentState::Pending,
                    model: model.to_string(),
                    confidence: None,
                    latency_ms: None,
                })
                .collect(),
            current_iteration: 0,
            progress: 0,
            message: "queued".to_string(),
        }
    }

    /// Degenerate status reconstructed from a persisted trace (for status
    /// queries after eviction).
    pub fn from_trace(trace: &Trace) -> Self {
        let status = match trace.status {
            TraceStatus::Completed => SwarmPhase::Completed,
            TraceStatus::Failed => SwarmPhase::Failed,
            TraceStatus::Running => SwarmPhase::Running,
            TraceStatus::Pending => SwarmPhase::Pending,
        };
        let agents = trace
            .iterations
            .last()
            .map(|it| {
                it.agent_responses
                    .iter()
                    .map(|r| AgentStatus {
                        id: r.agent_id.clone(),
                        status: if r.error.is_some() {
                            AgentState::Failed
                        } else {
                            AgentState::Completed
                        },
                        model: r.model.clone(),
                        confidence: Some(r.confidence),
                        latency_ms: Some(r.latency_ms),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            trace_id: trace.trace_id,
            status,
            agents,
            current_iteration: trace.iterations.len(),
            progress: if status.is_terminal() { 100 } else { 0 },
            message: trace
                .error
                .clone()
                .unwrap_or_else(|| "reconstructed from trace".to_string()),
        }
    }
}
