//! HTTP route handlers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::metrics::EXPOSITION_CONTENT_TYPE;
use crate::safety::RedTeamFlag;
use crate::swarm::types::{Iteration, SwarmStatus};
use crate::tiering::{classify, run_handler, Tier};

use super::error::ApiError;
use super::validate::{
    parse_trace_id, validate_max_budget, validate_mission, validate_pagination,
    validate_swarm_size,
};
use super::AppState;

// =============================================================================
// Request / response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub mission: String,
    pub swarm_size: Option<u64>,
    pub max_budget: Option<f64>,
    /// Auxiliary text for task-tier handlers; defaults to the mission itself.
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub trace_id: String,
    pub synthesis: String,
    pub iterations: Vec<Iteration>,
    pub cost: f64,
    pub duration_ms: u64,
    pub red_team_flags: Vec<RedTeamFlag>,
    pub tier: Tier,
    pub tier_reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub mission: String,
    pub swarm_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Sets the engine's cancel flag if the request future is dropped before the
/// mission finishes (client disconnect aborts the mission).
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl CancelOnDrop {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn execute_mission(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    if let Err(retry_after) = state.execute_limiter.check(addr.ip()) {
        return Err(ApiError::RateLimited {
            retry_after_secs: retry_after.as_secs().max(1),
        });
    }

    validate_mission(&req.mission)?;
    let swarm_size = validate_swarm_size(req.swarm_size)?;
    let max_budget = validate_max_budget(req.max_budget)?;

    let started = Instant::now();
    let classification = classify(&req.mission);

    // A blocked input must produce a persisted failed trace even when the
    // classifier would have kept it local, so it takes the mission path.
    let blocked = crate::safety::should_block(&crate::safety::scan(
        &req.mission,
        crate::safety::FlagSource::Input,
    ));

    // Task tier: zero-cost local handling, no persisted trace.
    if classification.tier == Tier::Task && !blocked {
        let handler = classification
            .local_handler
            .unwrap_or(crate::tiering::LocalHandler::Identity);
        let content = req.content.as_deref().unwrap_or(&req.mission);
        let synthesis = run_handler(handler, &req.mission, content);
        return Ok(Json(ExecuteResponse {
            trace_id: format!("task-{}", Utc::now().timestamp_millis()),
            synthesis,
            iterations: Vec::new(),
            cost: 0.0,
            duration_ms: started.elapsed().as_millis() as u64,
            red_team_flags: Vec::new(),
            tier: Tier::Task,
            tier_reason: classification.reason,
        }));
    }

    // Mission tier: run the swarm in its own task so a client disconnect
    // cancels it rather than silently dropping it mid-flight.
    let cancel = Arc::new(AtomicBool::new(false));
    let guard = CancelOnDrop::new(cancel.clone());
    let engine = state.engine.clone();
    let mission = req.mission.clone();
    let handle = tokio::spawn(async move {
        engine
            .execute_mission(&mission, swarm_size, max_budget, cancel)
            .await
    });

    let result = handle
        .await
        .map_err(|e| ApiError::Internal(format!("mission task panicked: {e}")))?;
    guard.disarm();
    let trace = result.map_err(ApiError::from)?;

    Ok(Json(ExecuteResponse {
        trace_id: trace.trace_id.to_string(),
        synthesis: trace.synthesis_result.unwrap_or_default(),
        iterations: trace.iterations,
        cost: trace.actual_cost,
        duration_ms: trace.duration_ms,
        red_team_flags: trace.red_team_flags,
        tier: Tier::Mission,
        tier_reason: classification.reason,
    }))
}

pub async fn estimate_mission(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EstimateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_mission(&req.mission)?;
    let swarm_size = validate_swarm_size(req.swarm_size)?;
    let estimate = state.engine.estimate(&req.mission, swarm_size);
    Ok(Json(crate::estimator::CostEstimateBody::from(&estimate)))
}

pub async fn get_trace(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_trace_id(&trace_id)?;
    let trace = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("no trace {id}")))?;
    Ok(Json(trace))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_trace_id(&trace_id)?;
    if let Some(status) = state.swarms.get(id) {
        return Ok(Json(status));
    }
    let trace = state
        .store
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("no trace {id}")))?;
    Ok(Json(SwarmStatus::from_trace(&trace)))
}

pub async fn list_traces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = validate_pagination(query.limit, query.offset)?;
    let page = state.store.list(limit, offset);
    Ok(Json(json!({ "traces": page.items, "total": page.total })))
}

pub async fn active_swarms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.swarms.list())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.render(),
    )
}
