//! WebSocket relay for swarm progress.
//!
//! Clients send subscription messages after connect; each subscription runs
//! in its own task feeding a single writer. Closing the socket aborts every
//! task, which drops the bus receivers and releases the subscriptions.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::swarm::types::SwarmStatus;

use super::AppState;

/// Poll interval for the `subscribe` compatibility shim.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe {
        #[serde(rename = "traceId")]
        trace_id: Uuid,
    },
    StreamThoughts {
        #[serde(rename = "traceId")]
        trace_id: Uuid,
    },
    StreamEvents {
        #[serde(rename = "traceId")]
        trace_id: Uuid,
    },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer: JoinHandle<()> = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: Vec<JoinHandle<()>> = Vec::new();

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Subscribe { trace_id }) => {
                subscriptions.push(spawn_status_poll(state.clone(), trace_id, tx.clone()));
            }
            Ok(ClientMessage::StreamThoughts { trace_id }) => {
                let rx = state.bus.subscribe_thoughts(trace_id);
                subscriptions.push(spawn_thought_relay(rx, tx.clone()));
            }
            Ok(ClientMessage::StreamEvents { trace_id }) => {
                let rx = state.bus.subscribe_events(trace_id);
                subscriptions.push(spawn_event_relay(rx, tx.clone()));
            }
            Err(e) => {
                debug!(error = %e, "Unparseable WS client message");
                let _ = tx
                    .send(json!({ "type": "error", "error": "unrecognized message" }).to_string())
                    .await;
            }
        }
    }

    // Disconnect releases every subscription for this connection.
    for task in &subscriptions {
        task.abort();
    }
    writer.abort();
}

/// Compatibility shim: poll the status registry at 500 ms, stop at terminal.
fn spawn_status_poll(
    state: Arc<AppState>,
    trace_id: Uuid,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let status = state
                .swarms
                .get(trace_id)
                .or_else(|| state.store.get(trace_id).map(|t| SwarmStatus::from_trace(&t)));

            let Some(status) = status else {
                let _ = tx
                    .send(json!({ "type": "error", "error": "unknown trace" }).to_string())
                    .await;
                return;
            };

            let terminal = status.status.is_terminal();
            let payload = json!({ "type": "swarm_update", "data": status }).to_string();
            if tx.send(payload).await.is_err() || terminal {
                return;
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
    })
}

fn spawn_thought_relay(
    mut rx: broadcast::Receiver<crate::events::AgentThought>,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(thought) => {
                    let payload = json!({
                        "type": "agent_thought",
                        "agentId": thought.agent_id,
                        "thoughtType": thought.thought_type,
                        "content": thought.content,
                        "confidence": thought.confidence,
                        "timestamp": thought.timestamp,
                    })
                    .to_string();
                    if tx.send(payload).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(dropped = n, "Thought subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}

fn spawn_event_relay(
    mut rx: broadcast::Receiver<crate::events::SwarmEvent>,
    tx: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload = json!({
                        "type": "swarm_event",
                        "eventType": event.event_type,
                        "data": event.data,
                        "timestamp": event.timestamp,
                    })
                    .to_string();
                    if tx.send(payload).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(dropped = n, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}
