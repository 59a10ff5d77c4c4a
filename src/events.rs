//! In-process pub/sub for swarm progress, keyed by trace id.
//!
//! Each trace gets two broadcast channels: agent-level **thoughts** and
//! engine-level **swarm events**. Publishing never blocks; slow subscribers
//! lag and drop the oldest events in their buffer. Dropping a receiver is the
//! unsubscribe; `close` tears the channels down once a trace is terminal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-subscriber buffer capacity. Laggards drop oldest-first.
const CHANNEL_CAPACITY: usize = 256;

/// Kind of streamed agent thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtType {
    Thinking,
    Response,
    Critique,
    Refined,
}

/// Agent-level streaming text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    pub agent_id: String,
    pub thought_type: ThoughtType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl AgentThought {
    pub fn new(agent_id: impl Into<String>, thought_type: ThoughtType, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            thought_type,
            content: content.into(),
            confidence: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Engine-level event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmEventType {
    AgentStart,
    AgentThought,
    AgentComplete,
    CritiqueStart,
    CritiqueComplete,
    SynthesisStart,
    SynthesisComplete,
    ConsensusUpdate,
}

/// Engine-level event with a free-form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmEvent {
    pub event_type: SwarmEventType,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl SwarmEvent {
    pub fn new(event_type: SwarmEventType, data: serde_json::Value) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
        }
    }
}

struct TraceChannels {
    thoughts: broadcast::Sender<AgentThought>,
    events: broadcast::Sender<SwarmEvent>,
}

impl TraceChannels {
    fn new() -> Self {
        let (thoughts, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { thoughts, events }
    }
}

/// Event bus keyed by trace id.
#[derive(Default)]
pub struct EventBus {
    channels: RwLock<HashMap<Uuid, TraceChannels>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a thought for a trace. Non-blocking; no-op without a channel
    /// and no error when there are no subscribers.
    pub fn publish_thought(&self, trace_id: Uuid, thought: AgentThought) {
        let channels = self.channels.read();
        if let Some(c) = channels.get(&trace_id) {
            let _ = c.thoughts.send(thought);
        }
    }

    /// Publish a swarm event for a trace.
    pub fn publish_event(&self, trace_id: Uuid, event: SwarmEvent) {
        let channels = self.channels.read();
        if let Some(c) = channels.get(&trace_id) {
            let _ = c.events.send(event);
        }
    }

    /// Subscribe to a trace's thoughts. Creates the channel pair if the trace
    /// has not opened yet, so subscribers may attach ahead of the engine.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe_thoughts(&self, trace_id: Uuid) -> broadcast::Receiver<AgentThought> {
        let mut channels = self.channels.write();
        channels
            .entry(trace_id)
            .or_insert_with(TraceChannels::new)
            .thoughts
            .subscribe()
    }

    /// Subscribe to a trace's swarm events.
    pub fn subscribe_events(&self, trace_id: Uuid) -> broadcast::Receiver<SwarmEvent> {
        let mut channels = self.channels.write();
        channels
            .entry(trace_id)
            .or_insert_with(TraceChannels::new)
            .events
            .subscribe()
    }

    /// Ensure channels exist for a trace (called at mission start).
    pub fn open(&self, trace_id: Uuid) {
        let mut channels = self.channels.write();
        channels.entry(trace_id).or_insert_with(TraceChannels::new);
    }

    /// Tear down a trace's channels. Outstanding receivers observe `Closed`.
    pub fn close(&self, trace_id: Uuid) {
        self.channels.write().remove(&trace_id);
    }

    /// Subscribers across both channels of a trace.
    pub fn subscriber_count(&self, trace_id: Uuid) -> usize {
        let channels = self.channels.read();
        channels
            .get(&trace_id)
            .map(|c| c.thoughts.receiver_count() + c.events.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_only_their_trace() {
        let bus = EventBus::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut rx_a = bus.subscribe_events(a);
        let mut rx_b = bus.subscribe_events(b);

        bus.publish_event(a, SwarmEvent::new(SwarmEventType::AgentStart, serde_json::json!({})));

        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.event_type, SwarmEventType::AgentStart);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_block_or_fail() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        bus.open(id);
        for _ in 0..1_000 {
            bus.publish_event(id, SwarmEvent::new(SwarmEventType::ConsensusUpdate, serde_json::json!({})));
        }
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        let mut rx = bus.subscribe_thoughts(id);

        for i in 0..10 {
            bus.publish_thought(
                id,
                AgentThought::new("agent-1", ThoughtType::Thinking, format!("t{i}")),
            );
        }
        for i in 0..10 {
            assert_eq!(rx.recv().await.unwrap().content, format!("t{i}"));
        }
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        let mut rx = bus.subscribe_thoughts(id);

        for i in 0..(CHANNEL_CAPACITY + 10) {
            bus.publish_thought(
                id,
                AgentThought::new("agent-1", ThoughtType::Thinking, format!("t{i}")),
            );
        }

        // First recv reports the lag, subsequent reads resume at the oldest
        // retained event.
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert_eq!(n as usize, 10),
            other => panic!("expected lag, got {other:?}"),
        }
        assert_eq!(rx.recv().await.unwrap().content, "t10");
    }

    #[tokio::test]
    async fn close_ends_subscriptions() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        let mut rx = bus.subscribe_events(id);
        bus.close(id);
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn many_subscribers_supported() {
        let bus = EventBus::new();
        let id = Uuid::new_v4();
        let receivers: Vec<_> = (0..120).map(|_| bus.subscribe_events(id)).collect();
        assert_eq!(bus.subscriber_count(id), 120);

        bus.publish_event(id, SwarmEvent::new(SwarmEventType::SynthesisComplete, serde_json::json!({})));
        for mut rx in receivers {
            assert!(rx.recv().await.is_ok());
        }
    }
}
