//! HTTP + WebSocket surface over the orchestration core.

pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod validate;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::events::EventBus;
use crate::metrics::MetricsRegistry;
use crate::store::TraceStore;
use crate::swarm::{ActiveSwarms, SwarmEngine};

use rate_limit::RateLimiter;

/// Requests per minute allowed per IP across the API.
const API_RATE_LIMIT: usize = 60;
/// Stricter per-IP budget for mission execution.
const EXECUTE_RATE_LIMIT: usize = 10;

pub struct AppState {
    pub engine: Arc<SwarmEngine>,
    pub store: Arc<TraceStore>,
    pub bus: Arc<EventBus>,
    pub metrics: Arc<MetricsRegistry>,
    pub swarms: Arc<ActiveSwarms>,
    pub api_limiter: RateLimiter,
    pub execute_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        engine: Arc<SwarmEngine>,
        store: Arc<TraceStore>,
        bus: Arc<EventBus>,
        metrics: Arc<MetricsRegistry>,
        swarms: Arc<ActiveSwarms>,
    ) -> Self {
        Self::with_rate_limits(
            engine,
            store,
            bus,
            metrics,
            swarms,
            API_RATE_LIMIT,
            EXECUTE_RATE_LIMIT,
        )
    }

    pub fn with_rate_limits(
        engine: Arc<SwarmEngine>,
        store: Arc<TraceStore>,
        bus: Arc<EventBus>,
        metrics: Arc<MetricsRegistry>,
        swarms: Arc<ActiveSwarms>,
        api_limit: usize,
        execute_limit: usize,
    ) -> Self {
        Self {
            engine,
            store,
            bus,
            metrics,
            swarms,
            api_limiter: RateLimiter::new(api_limit, Duration::from_secs(60)),
            execute_limiter: RateLimiter::new(execute_limit, Duration::from_secs(60)),
        }
    }
}

/// Per-IP limiter for every route; the execute handler applies its own
/// stricter window on top.
async fn rate_limit_layer(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(retry_after) = state.api_limiter.check(addr.ip()) {
        return error::ApiError::RateLimited {
            retry_after_secs: retry_after.as_secs().max(1),
        }
        .into_response();
    }
    next.run(request).await
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/mission/execute", post(routes::execute_mission))
        .route("/api/mission/estimate", post(routes::estimate_mission))
        .route("/api/mission/:traceId", get(routes::get_trace))
        .route("/api/mission/:traceId/status", get(routes::get_status))
        .route("/api/traces", get(routes::list_traces))
        .route("/api/swarms/active", get(routes::active_swarms))
        .route("/api/health", get(routes::health))
        .route("/metrics", get(routes::metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("quorum server listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
