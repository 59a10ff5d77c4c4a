//! Mission execution: fan-out, critique loop, guardian, synthesis.
//!
//! One `execute_mission` call drives a mission to a terminal trace. Agent
//! calls run concurrently after their stagger delay; the critique loop is
//! strictly sequential; every meaningful state change is persisted and
//! published before the next phase begins.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::Rng;
use serde_json::json;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::estimator::{estimate_mission_cost, CostEstimate};
use crate::events::{AgentThought, EventBus, SwarmEvent, SwarmEventType, ThoughtType};
use crate::gateway::pricing::{nanos_to_usd, usd_to_nanos};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::metrics::MetricsRegistry;
use crate::safety::{sanitize, scan, should_block, FlagSource, RedTeamFlag};
use crate::store::TraceStore;

use super::config::SwarmConfig;
use super::confidence::parse_confidence;
use super::critique::parse_reviewer_output;
use super::posterior::compute_posterior_weights;
use super::prompts;
use super::status::ActiveSwarms;
use super::types::{
    AgentResponse, AgentState, Iteration, SwarmPhase, SwarmStatus, TokenUsage, Trace, TraceStatus,
};

// =============================================================================
// Constants
// =============================================================================

/// Upper bound on critique rounds per mission.
pub const MAX_CRITIQUE_ITERATIONS: usize = 5;

/// Consensus at or above this ends the critique loop early.
pub const CONSENSUS_THRESHOLD: f64 = 0.92;

/// A round improving consensus by less than this counts as stagnant.
pub const MIN_CONSENSUS_IMPROVEMENT: f64 = 0.02;

/// Consecutive stagnant rounds before the guardian halts the loop.
pub const GUARDIAN_PATIENCE: u32 = 2;

/// Token cap for each agent's fan-out answer.
const AGENT_MAX_TOKENS: u32 = 600;

/// Token cap for a reviewer round.
const REVIEWER_MAX_TOKENS: u32 = 800;

/// Token cap for the synthesis answer.
const SYNTHESIS_MAX_TOKENS: u32 = 1_000;

// =============================================================================
// Error type
// =============================================================================

#[derive(Debug, Error)]
pub enum SwarmError {
    /// Input scan raised a blocking flag; a failed trace was persisted.
    #[error("Mission blocked by safety system")]
    SafetyBlocked { trace_id: Uuid },

    /// Estimate exceeded the budget; no trace was persisted.
    #[error("estimated cost ${estimated:.4} exceeds budget ${budget:.2}")]
    BudgetExceeded { estimated: f64, budget: f64 },

    /// Primary and fallback synthesis both failed; a failed trace exists.
    #[error("synthesis failed: {message}")]
    SynthesisFailed { trace_id: Uuid, message: String },

    /// The caller's cancellation signal fired; a failed trace exists.
    #[error("cancelled")]
    Cancelled { trace_id: Uuid },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

// =============================================================================
// Engine
// =============================================================================

pub struct SwarmEngine {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<TraceStore>,
    bus: Arc<EventBus>,
    metrics: Arc<MetricsRegistry>,
    swarms: Arc<ActiveSwarms>,
    config: SwarmConfig,
}

impl SwarmEngine {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<TraceStore>,
        bus: Arc<EventBus>,
        metrics: Arc<MetricsRegistry>,
        swarms: Arc<ActiveSwarms>,
        config: SwarmConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            bus,
            metrics,
            swarms,
            config,
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Estimate a mission without executing it.
    pub fn estimate(&self, mission: &str, swarm_size: Option<usize>) -> CostEstimate {
        let size = self.config.clamp_swarm_size(swarm_size);
        estimate_mission_cost(
            mission,
            size,
            &self.config.swarm_model,
            &self.config.synthesis_model,
            usd_to_nanos(self.config.default_max_budget_usd),
        )
    }

    /// Run a mission to a terminal trace. Blocks until terminal.
    pub async fn execute_mission(
        &self,
        mission: &str,
        swarm_size: Option<usize>,
        max_budget_usd: Option<f64>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Trace, SwarmError> {
        let started = Instant::now();
        self.metrics.mission_started();

        // Preflight: input safety scan.
        let input_flags = scan(mission, FlagSource::Input);
        self.metrics.red_team_flags(input_flags.len() as u64);
        if should_block(&input_flags) {
            let mut trace = Trace::new(sanitize(mission), 0.0);
            trace.red_team_flags = input_flags;
            trace.status = TraceStatus::Failed;
            trace.error = Some("Mission blocked by safety system".to_string());
            trace.duration_ms = started.elapsed().as_millis() as u64;
            self.store.save(&trace);
            self.metrics.mission_failed();
            warn!(trace_id = %trace.trace_id, "Mission blocked by safety scan");
            return Err(SwarmError::SafetyBlocked {
                trace_id: trace.trace_id,
            });
        }

        // Preflight: budget.
        let size = self.config.clamp_swarm_size(swarm_size);
        let budget_usd = max_budget_usd.unwrap_or(self.config.default_max_budget_usd);
        let budget_nanos = usd_to_nanos(budget_usd);
        let estimate = estimate_mission_cost(
            mission,
            size,
            &self.config.swarm_model,
            &self.config.synthesis_model,
            budget_nanos,
        );
        if !estimate.within_budget {
            return Err(SwarmError::BudgetExceeded {
                estimated: estimate.total_usd(),
                budget: budget_usd,
            });
        }

        // Initial trace and status.
        let mut trace = Trace::new(sanitize(mission), estimate.total_usd());
        trace.red_team_flags = input_flags;
        self.store.save(&trace);
        let trace_id = trace.trace_id;

        self.bus.open(trace_id);
        let mut status = SwarmStatus::pending(trace_id, size, &self.config.swarm_model);
        status.status = SwarmPhase::Running;
        status.message = "fanning out".to_string();
        self.swarms.insert(status);

        info!(trace_id = %trace_id, swarm_size = size, "Mission started");

        let result = self
            .run_swarm(trace_id, mission, size, started, cancel)
            .await;

        match &result {
            Ok(trace) => {
                info!(
                    trace_id = %trace_id,
                    duration_ms = trace.duration_ms,
                    actual_cost = trace.actual_cost,
                    "Mission completed"
                );
            }
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "Mission failed");
            }
        }
        self.schedule_eviction(trace_id);
        result
    }

    /// Everything after preflight. Failures here persist a failed trace.
    async fn run_swarm(
        &self,
        trace_id: Uuid,
        mission: &str,
        size: usize,
        started: Instant,
        cancel: Arc<AtomicBool>,
    ) -> Result<Trace, SwarmError> {
        let mut cost_nanos: i64 = 0;

        // Fan-out.
        let mut responses = self
            .fan_out(trace_id, mission, size, cancel.clone())
            .await;
        responses.sort_by_key(|r| agent_index(&r.agent_id));
        cost_nanos += responses
            .iter()
            .map(|r| {
                crate::gateway::pricing::chat_cost(&r.model, r.tokens.input, r.tokens.output)
            })
            .sum::<i64>();

        if cancel.load(Ordering::Relaxed) {
            return Err(self.fail_mission(trace_id, "cancelled", cost_nanos, started));
        }

        // Scan agent output.
        let mut output_flags: Vec<RedTeamFlag> = Vec::new();
        for r in &responses {
            if !r.response.is_empty() {
                output_flags.extend(scan(&r.response, FlagSource::Output));
            }
        }
        self.metrics.red_team_flags(output_flags.len() as u64);
        if !output_flags.is_empty() {
            self.store.update(trace_id, |t| {
                t.red_team_flags.extend(output_flags.clone());
            });
        }

        // Critique loop.
        let has_live_responses = responses.iter().any(|r| r.error.is_none());
        if has_live_responses {
            cost_nanos += self
                .critique_loop(trace_id, mission, &mut responses, &cancel)
                .await;
        } else {
            // All agents failed: record the fan-out as the only iteration.
            let consensus = mean_confidence(&responses);
            self.append_iteration(trace_id, 1, &responses, consensus);
        }

        if cancel.load(Ordering::Relaxed) {
            return Err(self.fail_mission(trace_id, "cancelled", cost_nanos, started));
        }

        // Synthesis.
        let weights = compute_posterior_weights(&responses);
        self.swarms.update(trace_id, |s| {
            s.status = SwarmPhase::Synthesizing;
            s.progress = 85;
            s.message = "synthesizing".to_string();
        });
        self.bus.publish_event(
            trace_id,
            SwarmEvent::new(SwarmEventType::SynthesisStart, json!({ "agentCount": responses.len() })),
        );

        let synthesis = match self
            .synthesize(trace_id, mission, &responses, &weights, &cancel)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                if matches!(e, ProviderError::Cancelled) || cancel.load(Ordering::Relaxed) {
                    return Err(self.fail_mission(trace_id, "cancelled", cost_nanos, started));
                }
                let message = format!("synthesis failed on primary and fallback: {e}");
                return Err(self.fail_mission(trace_id, &message, cost_nanos, started));
            }
        };
        cost_nanos += synthesis.cost_nanodollars;

        // Scan synthesis output.
        let synthesis_flags = scan(&synthesis.content, FlagSource::Synthesis);
        self.metrics.red_team_flags(synthesis_flags.len() as u64);

        // Terminal persistence.
        let duration_ms = started.elapsed().as_millis() as u64;
        let trace = self
            .store
            .update(trace_id, |t| {
                t.red_team_flags.extend(synthesis_flags.clone());
                t.final_posterior_weights = weights.clone();
                t.synthesis_result = Some(sanitize(&synthesis.content));
                t.actual_cost = nanos_to_usd(cost_nanos.max(0));
                t.duration_ms = duration_ms;
                t.status = TraceStatus::Completed;
            })
            .unwrap_or_else(|| {
                // Store degraded to memory-only and lost the entry; rebuild a
                // terminal record so the caller still gets a trace.
                let mut t = Trace::new(sanitize(mission), 0.0);
                t.trace_id = trace_id;
                t.synthesis_result = Some(sanitize(&synthesis.content));
                t.status = TraceStatus::Completed;
                t.duration_ms = duration_ms;
                self.store.save(&t);
                t
            });

        self.metrics.record_duration_ms(duration_ms);
        self.metrics.mission_succeeded();
        self.metrics.add_cost_nanos(cost_nanos.max(0));

        self.bus.publish_event(
            trace_id,
            SwarmEvent::new(
                SwarmEventType::SynthesisComplete,
                json!({ "durationMs": duration_ms, "actualCost": nanos_to_usd(cost_nanos.max(0)) }),
            ),
        );
        self.swarms.update(trace_id, |s| {
            s.status = SwarmPhase::Completed;
            s.progress = 100;
            s.message = "completed".to_string();
        });

        Ok(trace)
    }

    /// Launch all agents; each waits out its stagger delay, then calls
    /// upstream once. Failures are absorbed into zero-confidence responses.
    async fn fan_out(
        &self,
        trace_id: Uuid,
        mission: &str,
        size: usize,
        cancel: Arc<AtomicBool>,
    ) -> Vec<AgentResponse> {
        let completed = Arc::new(AtomicUsize::new(0));

        stream::iter((1..=size).map(|i| {
            let cancel = cancel.clone();
            let completed = completed.clone();
            async move {
                let agent_id = format!("agent-{i}");
                let delay = self.config.throttle_ms * (i as u64 - 1);
                if delay > 0 {
                    sleep(Duration::from_millis(delay)).await;
                }

                if cancel.load(Ordering::Relaxed) {
                    return cancelled_response(&agent_id, &self.config.swarm_model);
                }

                self.bus.publish_event(
                    trace_id,
                    SwarmEvent::new(
                        SwarmEventType::AgentStart,
                        json!({ "agentId": agent_id, "model": self.config.swarm_model }),
                    ),
                );
                self.bus.publish_thought(
                    trace_id,
                    AgentThought::new(&agent_id, ThoughtType::Thinking, "working on the mission"),
                );
                self.swarms.update(trace_id, |s| {
                    if let Some(a) = s.agents.iter_mut().find(|a| a.id == agent_id) {
                        a.status = AgentState::Running;
                    }
                });
                self.metrics.agents_started(1);

                let temperature = 0.8 + rand::thread_rng().gen_range(0.0..0.4) as f32;
                let request = ChatRequest::new(
                    ChatModel::openrouter(&self.config.swarm_model),
                    prompts::agent_messages(&agent_id, mission),
                    Attribution::new("swarm::agent").with_trace(trace_id),
                )
                .temperature(temperature)
                .max_tokens(AGENT_MAX_TOKENS);

                let result = self
                    .gateway
                    .chat_cancellable(request, Some(cancel.clone()))
                    .await;
                self.metrics.agents_finished(1);

                let response = match result {
                    Ok(resp) => {
                        let (text, confidence) = parse_confidence(&resp.content);
                        self.bus.publish_thought(
                            trace_id,
                            AgentThought::new(&agent_id, ThoughtType::Response, text.clone())
                                .with_confidence(confidence),
                        );
                        AgentResponse {
                            agent_id: agent_id.clone(),
                            model: self.config.swarm_model.clone(),
                            response: text,
                            confidence,
                            latency_ms: resp.latency.as_millis() as u64,
                            tokens: TokenUsage {
                                input: resp.input_tokens,
                                output: resp.output_tokens,
                            },
                            error: None,
                        }
                    }
                    Err(ProviderError::Cancelled) => {
                        cancelled_response(&agent_id, &self.config.swarm_model)
                    }
                    Err(e) => {
                        warn!(trace_id = %trace_id, agent = %agent_id, error = %e, "Agent call failed");
                        AgentResponse {
                            agent_id: agent_id.clone(),
                            model: self.config.swarm_model.clone(),
                            response: String::new(),
                            confidence: 0.0,
                            latency_ms: 0,
                            tokens: TokenUsage::default(),
                            error: Some(e.to_string()),
                        }
                    }
                };

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                let progress = (done * 80 / size) as u8;
                let agent_state = if response.error.is_some() {
                    AgentState::Failed
                } else {
                    AgentState::Completed
                };
                self.swarms.update(trace_id, |s| {
                    if let Some(a) = s.agents.iter_mut().find(|a| a.id == response.agent_id) {
                        a.status = agent_state;
                        a.confidence = Some(response.confidence);
                        a.latency_ms = Some(response.latency_ms);
                    }
                    s.progress = progress;
                    s.message = format!("{done}/{size} agents complete");
                });
                self.bus.publish_event(
                    trace_id,
                    SwarmEvent::new(
                        SwarmEventType::AgentComplete,
                        json!({
                            "agentId": response.agent_id,
                            "confidence": response.confidence,
                            "latencyMs": response.latency_ms,
                            "failed": response.error.is_some(),
                        }),
                    ),
                );

                response
            }
        }))
        .buffer_unordered(size)
        .collect()
        .await
    }

    /// Multi-round critique under the guardian. Returns accumulated reviewer
    /// cost in nanodollars; mutates `responses` confidences in place.
    async fn critique_loop(
        &self,
        trace_id: Uuid,
        mission: &str,
        responses: &mut Vec<AgentResponse>,
        cancel: &Arc<AtomicBool>,
    ) -> i64 {
        let mut cost_nanos: i64 = 0;
        let mut previous_consensus: Option<f64> = None;
        let mut stagnant: u32 = 0;

        for k in 1..=MAX_CRITIQUE_ITERATIONS {
            if cancel.load(Ordering::Relaxed) {
                break;
            }

            self.swarms.update(trace_id, |s| {
                s.current_iteration = k;
                s.message = format!("critique round {k}");
            });
            self.bus.publish_event(
                trace_id,
                SwarmEvent::new(
                    SwarmEventType::CritiqueStart,
                    json!({ "iteration": k, "agentCount": responses.len() }),
                ),
            );

            let request = ChatRequest::new(
                ChatModel::openrouter(&self.config.reviewer_model),
                prompts::reviewer_messages(mission, responses),
                Attribution::new("swarm::reviewer").with_trace(trace_id),
            )
            .temperature(0.2)
            .max_tokens(REVIEWER_MAX_TOKENS);

            let consensus;
            let mut reviewer_failed = false;

            match self
                .gateway
                .chat_cancellable(request, Some(cancel.clone()))
                .await
            {
                Ok(resp) => {
                    cost_nanos += resp.cost_nanodollars;
                    self.bus.publish_thought(
                        trace_id,
                        AgentThought::new("reviewer", ThoughtType::Critique, resp.content.clone()),
                    );

                    let verdict = parse_reviewer_output(&resp.content);
                    for r in responses.iter_mut() {
                        if let Some(judged) = verdict.scores.get(&r.agent_id) {
                            r.confidence = judged.score;
                            self.bus.publish_thought(
                                trace_id,
                                AgentThought::new(
                                    &r.agent_id,
                                    ThoughtType::Refined,
                                    judged
                                        .justification
                                        .clone()
                                        .unwrap_or_else(|| "re-scored by reviewer".to_string()),
                                )
                                .with_confidence(judged.score),
                            );
                        }
                    }
                    consensus = verdict.consensus.unwrap_or_else(|| mean_confidence(responses));
                }
                Err(ProviderError::Cancelled) => break,
                Err(e) => {
                    // Reviewer failure degrades to mean-confidence consensus
                    // and counts toward the guardian's patience.
                    warn!(trace_id = %trace_id, iteration = k, error = %e, "Reviewer call failed");
                    reviewer_failed = true;
                    consensus = mean_confidence(responses);
                }
            }

            self.append_iteration(trace_id, k, responses, consensus);
            self.bus.publish_event(
                trace_id,
                SwarmEvent::new(
                    SwarmEventType::CritiqueComplete,
                    json!({ "iteration": k, "consensusScore": consensus }),
                ),
            );
            self.bus.publish_event(
                trace_id,
                SwarmEvent::new(
                    SwarmEventType::ConsensusUpdate,
                    json!({
                        "iteration": k,
                        "consensusScore": consensus,
                        "threshold": CONSENSUS_THRESHOLD,
                    }),
                ),
            );

            // Guardian: halt stagnant loops to preserve budget.
            let delta = previous_consensus.map(|p| consensus - p);
            let is_stagnant =
                reviewer_failed || matches!(delta, Some(d) if d < MIN_CONSENSUS_IMPROVEMENT);
            if is_stagnant {
                stagnant += 1;
            } else if delta.is_some() {
                stagnant = 0;
            }
            previous_consensus = Some(consensus);

            if stagnant >= GUARDIAN_PATIENCE {
                self.bus.publish_event(
                    trace_id,
                    SwarmEvent::new(
                        SwarmEventType::ConsensusUpdate,
                        json!({
                            "iteration": k,
                            "consensusScore": consensus,
                            "threshold": CONSENSUS_THRESHOLD,
                            "guardianFail": true,
                        }),
                    ),
                );
                info!(trace_id = %trace_id, iteration = k, "Guardian halted stagnant critique loop");
                break;
            }

            if consensus >= CONSENSUS_THRESHOLD {
                break;
            }
        }

        cost_nanos
    }

    /// Append one iteration and refresh the persisted posterior weights.
    fn append_iteration(
        &self,
        trace_id: Uuid,
        iteration_id: usize,
        responses: &[AgentResponse],
        consensus: f64,
    ) {
        let weights = compute_posterior_weights(responses);
        let iteration = Iteration {
            iteration_id,
            agent_responses: responses
                .iter()
                .map(|r| AgentResponse {
                    response: sanitize(&r.response),
                    ..r.clone()
                })
                .collect(),
            consensus_score: consensus.clamp(0.0, 1.0),
            timestamp: chrono::Utc::now(),
        };
        self.store.update(trace_id, |t| {
            t.iterations.push(iteration);
            t.final_posterior_weights = weights;
        });
    }

    /// Synthesis with one fallback-model retry.
    async fn synthesize(
        &self,
        trace_id: Uuid,
        mission: &str,
        responses: &[AgentResponse],
        weights: &std::collections::BTreeMap<String, f64>,
        cancel: &Arc<AtomicBool>,
    ) -> Result<crate::gateway::ChatResponse, ProviderError> {
        let messages = prompts::synthesis_messages(mission, responses, weights);

        let primary = ChatRequest::new(
            ChatModel::openrouter(&self.config.synthesis_model),
            messages.clone(),
            Attribution::new("swarm::synthesis").with_trace(trace_id),
        )
        .temperature(0.7)
        .max_tokens(SYNTHESIS_MAX_TOKENS);

        match self
            .gateway
            .chat_cancellable(primary, Some(cancel.clone()))
            .await
        {
            Ok(resp) => Ok(resp),
            Err(ProviderError::Cancelled) => Err(ProviderError::Cancelled),
            Err(primary_err) => {
                warn!(
                    trace_id = %trace_id,
                    error = %primary_err,
                    fallback = %self.config.fallback_model,
                    "Primary synthesis failed; retrying on fallback model"
                );
                let fallback = ChatRequest::new(
                    ChatModel::openrouter(&self.config.fallback_model),
                    messages,
                    Attribution::new("swarm::synthesis_fallback").with_trace(trace_id),
                )
                .temperature(0.7)
                .max_tokens(SYNTHESIS_MAX_TOKENS);
                self.gateway
                    .chat_cancellable(fallback, Some(cancel.clone()))
                    .await
                    .map_err(|fallback_err| {
                        ProviderError::provider(
                            "openrouter",
                            format!("primary: {primary_err}; fallback: {fallback_err}"),
                            false,
                        )
                    })
            }
        }
    }

    /// Persist a failed trace, update metrics and status, and build the error.
    fn fail_mission(
        &self,
        trace_id: Uuid,
        message: &str,
        cost_nanos: i64,
        started: Instant,
    ) -> SwarmError {
        let duration_ms = started.elapsed().as_millis() as u64;
        self.store.update(trace_id, |t| {
            if !t.status.is_terminal() {
                t.status = TraceStatus::Failed;
                t.error = Some(message.to_string());
                t.actual_cost = nanos_to_usd(cost_nanos.max(0));
                t.duration_ms = duration_ms;
            }
        });
        self.metrics.mission_failed();
        self.metrics.add_cost_nanos(cost_nanos.max(0));
        self.swarms.update(trace_id, |s| {
            s.status = SwarmPhase::Failed;
            s.message = message.to_string();
        });

        if message == "cancelled" {
            SwarmError::Cancelled { trace_id }
        } else {
            SwarmError::SynthesisFailed {
                trace_id,
                message: message.to_string(),
            }
        }
    }

    /// Terminal statuses linger briefly for late status readers, then the
    /// registry entry and the trace's event channels go away.
    fn schedule_eviction(&self, trace_id: Uuid) {
        let swarms = self.swarms.clone();
        let bus = self.bus.clone();
        let retention = self.config.status_retention;
        tokio::spawn(async move {
            sleep(retention).await;
            swarms.remove(trace_id);
            bus.close(trace_id);
        });
    }
}

fn cancelled_response(agent_id: &str, model: &str) -> AgentResponse {
    AgentResponse {
        agent_id: agent_id.to_string(),
        model: model.to_string(),
        response: String::new(),
        confidence: 0.0,
        latency_ms: 0,
        tokens: TokenUsage::default(),
        error: Some("cancelled".to_string()),
    }
}

fn mean_confidence(responses: &[AgentResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    responses.iter().map(|r| r.confidence).sum::<f64>() / responses.len() as f64
}

fn agent_index(agent_id: &str) -> usize {
    agent_id
        .rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &str, confidence: f64) -> AgentResponse {
        AgentResponse {
            agent_id: id.to_string(),
            model: "m".to_string(),
            response: "r".to_string(),
            confidence,
            latency_ms: 0,
            tokens: TokenUsage::default(),
            error: None,
        }
    }

    #[test]
    fn mean_confidence_of_empty_is_zero() {
        assert_eq!(mean_confidence(&[]), 0.0);
    }

    #[test]
    fn mean_confidence_averages() {
        let rs = vec![response("agent-1", 0.2), response("agent-2", 0.8)];
        assert!((mean_confidence(&rs) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn agent_index_orders_ids_numerically() {
        let mut rs = vec![
            response("agent-10", 0.5),
            response("agent-2", 0.5),
            response("agent-1", 0.5),
        ];
        rs.sort_by_key(|r| agent_index(&r.agent_id));
        let ids: Vec<&str> = rs.iter().map(|r| r.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["agent-1", "agent-2", "agent-10"]);
    }
}
