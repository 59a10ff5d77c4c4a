//! Swarm engine configuration.

use std::time::Duration;

/// Default models. The swarm workhorse is a free-tier model; the reviewer and
/// synthesis passes use a higher-quality model with a cheap fallback.
pub const DEFAULT_SWARM_MODEL: &str = "meta-llama/llama-3.3-70b-instruct:free";
pub const DEFAULT_REVIEWER_MODEL: &str = "anthropic/claude-3-5-sonnet";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "anthropic/claude-3-5-sonnet";
pub const DEFAULT_FALLBACK_MODEL: &str = "openai/gpt-4o-mini";

/// Default maximum mission budget in USD (documented choice; the evolved
/// variant used 2.0).
pub const DEFAULT_MAX_BUDGET_USD: f64 = 1.25;

#[derive(Debug, Clone)]
pub struct SwarmConfig {
    pub swarm_model: String,
    pub reviewer_model: String,
    pub synthesis_model: String,
    pub fallback_model: String,
    /// Starting swarm size when the request does not specify one.
    pub default_swarm_size: usize,
    /// Hard cap on concurrent agents per mission.
    pub max_agents: usize,
    /// Stagger between agent starts: agent i waits `i * throttle_ms`.
    /// Protects upstream free-tier rate limits.
    pub throttle_ms: u64,
    pub default_max_budget_usd: f64,
    /// How long a terminal SwarmStatus stays queryable before eviction.
    pub status_retention: Duration,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            swarm_model: DEFAULT_SWARM_MODEL.to_string(),
            reviewer_model: DEFAULT_REVIEWER_MODEL.to_string(),
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            default_swarm_size: 8,
            max_agents: 20,
            throttle_ms: 6_000,
            default_max_budget_usd: DEFAULT_MAX_BUDGET_USD,
            status_retention: Duration::from_secs(30),
        }
    }
}

impl SwarmConfig {
    /// Defaults with environment overrides for models and throttle.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("QUORUM_SWARM_MODEL") {
            config.swarm_model = v;
        }
        if let Ok(v) = std::env::var("QUORUM_REVIEWER_MODEL") {
            config.reviewer_model = v;
        }
        if let Ok(v) = std::env::var("QUORUM_SYNTHESIS_MODEL") {
            config.synthesis_model = v;
        }
        if let Ok(v) = std::env::var("QUORUM_FALLBACK_MODEL") {
            config.fallback_model = v;
        }
        if let Some(v) = std::env::var("QUORUM_THROTTLE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.throttle_ms = v;
        }
        config
    }

    /// Clamp a requested swarm size into the allowed range.
    pub fn clamp_swarm_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_swarm_size)
            .clamp(1, self.max_agents)
    }
}
