#![forbid(unsafe_code)]

//! # quorum-harness
//!
//! A Bayesian swarm mission orchestration server. A natural-language mission
//! is classified (trivial tasks run locally for free), budget-guarded, fanned
//! out to a throttled swarm of LLM agents, critiqued toward consensus under a
//! guardian that halts stagnation, weighted by posterior confidence, and
//! synthesized into one answer — with the full lifecycle persisted as a trace
//! and streamed to subscribers as it happens.

pub mod estimator;
pub mod events;
pub mod gateway;
pub mod metrics;
pub mod safety;
pub mod server;
pub mod store;
pub mod swarm;
pub mod tiering;

pub use estimator::{estimate_mission_cost, CostEstimate};
pub use events::{AgentThought, EventBus, SwarmEvent, SwarmEventType, ThoughtType};
pub use gateway::{Attribution, ChatGateway, NoopUsageSink, ProviderGateway, UsageSink};
pub use metrics::MetricsRegistry;
pub use safety::{sanitize, scan, should_block, FlagSource, RedTeamFlag, Severity};
pub use store::TraceStore;
pub use swarm::{ActiveSwarms, SwarmConfig, SwarmEngine, SwarmError, Trace, TraceStatus};
pub use tiering::{classify, Tier};
