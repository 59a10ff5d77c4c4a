//! Swarm engine: mission execution from fan-out to synthesized answer.

pub mod config;
pub mod confidence;
pub mod critique;
pub mod engine;
pub mod posterior;
pub mod prompts;
pub mod status;
pub mod types;

pub use config::SwarmConfig;
pub use engine::{SwarmEngine, SwarmError};
pub use status::ActiveSwarms;
pub use types::{
    AgentResponse, AgentState, AgentStatus, Iteration, SwarmPhase, SwarmStatus, TokenUsage, Trace,
    TraceStatus,
};
