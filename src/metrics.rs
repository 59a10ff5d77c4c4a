//! Process-wide metrics registry with text exposition.
//!
//! Counters and the gauge are plain atomics; the duration ring holds the most
//! recent request durations and quantiles are derived at exposition time.
//! Nothing here persists across restarts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::gateway::pricing::nanos_to_usd;
use crate::gateway::usage::{CallStatus, ProviderCallRecord, UsageSink};

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Capacity of the request-duration ring buffer.
const DURATION_RING_CAPACITY: usize = 1_000;

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    missions_total: AtomicU64,
    missions_success: AtomicU64,
    missions_failed: AtomicU64,
    red_team_flags_total: AtomicU64,
    upstream_calls_total: AtomicU64,
    upstream_call_errors_total: AtomicU64,
    /// Accumulated mission cost in nanodollars; exposed as USD.
    cost_total_nanos: AtomicI64,
    swarm_agents_active: AtomicI64,
    durations_ms: Mutex<VecDeque<u64>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mission_started(&self) {
        self.missions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mission_succeeded(&self) {
        self.missions_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mission_failed(&self) {
        self.missions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn red_team_flags(&self, count: u64) {
        if count > 0 {
            self.red_team_flags_total.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn add_cost_nanos(&self, nanos: i64) {
        self.cost_total_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn agents_started(&self, n: i64) {
        self.swarm_agents_active.fetch_add(n, Ordering::Relaxed);
    }

    pub fn agents_finished(&self, n: i64) {
        self.swarm_agents_active.fetch_sub(n, Ordering::Relaxed);
    }

    /// Record a completed request duration into the bounded ring.
    pub fn record_duration_ms(&self, ms: u64) {
        let mut ring = self.durations_ms.lock();
        if ring.len() == DURATION_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(ms);
    }

    pub fn missions_total(&self) -> u64 {
        self.missions_total.load(Ordering::Relaxed)
    }

    pub fn missions_success(&self) -> u64 {
        self.missions_success.load(Ordering::Relaxed)
    }

    pub fn missions_failed(&self) -> u64 {
        self.missions_failed.load(Ordering::Relaxed)
    }

    pub fn cost_total_usd(&self) -> f64 {
        nanos_to_usd(self.cost_total_nanos.load(Ordering::Relaxed))
    }

    pub fn swarm_agents_active(&self) -> i64 {
        self.swarm_agents_active.load(Ordering::Relaxed)
    }

    /// Render the registry in the text scrape format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1_024);

        counter(
            &mut out,
            "missions_total",
            "Total missions received",
            self.missions_total(),
        );
        counter(
            &mut out,
            "missions_success",
            "Missions that reached a completed trace",
            self.missions_success(),
        );
        counter(
            &mut out,
            "missions_failed",
            "Missions that reached a failed trace",
            self.missions_failed(),
        );
        counter(
            &mut out,
            "red_team_flags_total",
            "Red-team flags raised across all scans",
            self.red_team_flags_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "upstream_calls_total",
            "Upstream chat-completion calls attempted",
            self.upstream_calls_total.load(Ordering::Relaxed),
        );
        counter(
            &mut out,
            "upstream_call_errors_total",
            "Upstream chat-completion calls that errored",
            self.upstream_call_errors_total.load(Ordering::Relaxed),
        );

        out.push_str("# HELP cost_total Accumulated mission cost in USD\n");
        out.push_str("# TYPE cost_total counter\n");
        out.push_str(&format!("cost_total {:.9}\n", self.cost_total_usd()));

        out.push_str("# HELP swarm_agents_active Agents currently running\n");
        out.push_str("# TYPE swarm_agents_active gauge\n");
        out.push_str(&format!(
            "swarm_agents_active {}\n",
            self.swarm_agents_active()
        ));

        let (p50, p90, p99) = self.duration_quantiles();
        out.push_str("# HELP request_duration_ms Recent mission durations in milliseconds\n");
        out.push_str("# TYPE request_duration_ms summary\n");
        out.push_str(&format!("request_duration_ms{{quantile=\"0.5\"}} {p50}\n"));
        out.push_str(&format!("request_duration_ms{{quantile=\"0.9\"}} {p90}\n"));
        out.push_str(&format!("request_duration_ms{{quantile=\"0.99\"}} {p99}\n"));

        out
    }

    fn duration_quantiles(&self) -> (u64, u64, u64) {
        let ring = self.durations_ms.lock();
        if ring.is_empty() {
            return (0, 0, 0);
        }
        let mut sorted: Vec<u64> = ring.iter().copied().collect();
        sorted.sort_unstable();
        (
            quantile(&sorted, 0.5),
            quantile(&sorted, 0.9),
            quantile(&sorted, 0.99),
        )
    }
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name} {value}\n"));
}

fn quantile(sorted: &[u64], q: f64) -> u64 {
    let idx = ((sorted.len() as f64 * q).ceil() as usize).max(1) - 1;
    sorted[idx.min(sorted.len() - 1)]
}

/// Gateway calls feed call counters here; cost accounting stays with the
/// engine (cost_total tracks billed mission cost, not per-attempt estimates).
#[async_trait]
impl UsageSink for MetricsRegistry {
    async fn record(&self, record: ProviderCallRecord) {
        self.upstream_calls_total.fetch_add(1, Ordering::Relaxed);
        if record.status == CallStatus::Error {
            self.upstream_call_errors_total.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(
            model = %record.model,
            caller = record.caller,
            status = record.status.as_str(),
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            latency_ms = record.latency_ms,
            trace_id = ?record.trace_id,
            "provider call"
        );
    }
}
