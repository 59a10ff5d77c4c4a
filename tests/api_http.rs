//! HTTP contract tests over a real server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quorum_harness::events::EventBus;
use quorum_harness::gateway::openrouter::OpenRouterAdapter;
use quorum_harness::gateway::{GatewayConfig, NoopUsageSink, ProviderGateway};
use quorum_harness::metrics::MetricsRegistry;
use quorum_harness::server::{build_router, AppState};
use quorum_harness::store::TraceStore;
use quorum_harness::swarm::{ActiveSwarms, SwarmConfig, SwarmEngine};
use serde_json::{json, Value};

async fn spawn_app(execute_limit: usize) -> (String, Arc<AppState>, tempfile::TempDir) {
    // No test in this file reaches upstream; the adapter target is a dead end.
    let adapter = OpenRouterAdapter::with_config(
        "sk-test",
        "http://127.0.0.1:9",
        Duration::from_secs(1),
        None,
        None,
    )
    .unwrap();
    let gateway = Arc::new(ProviderGateway::with_config(
        adapter,
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 0,
            retry_base_delay: Duration::from_millis(0),
            retry_max_delay: Duration::from_millis(0),
        },
    ));

    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(TraceStore::open(tmp.path()));
    let bus = Arc::new(EventBus::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let swarms = Arc::new(ActiveSwarms::new());

    let config = SwarmConfig {
        throttle_ms: 0,
        default_swarm_size: 2,
        status_retention: Duration::from_millis(300),
        ..SwarmConfig::default()
    };
    let engine = Arc::new(SwarmEngine::new(
        gateway,
        store.clone(),
        bus.clone(),
        metrics.clone(),
        swarms.clone(),
        config,
    ));

    let state = Arc::new(AppState::with_rate_limits(
        engine,
        store,
        bus,
        metrics,
        swarms,
        10_000,
        execute_limit,
    ));
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (format!("http://{addr}"), state, tmp)
}

#[tokio::test]
async fn health_reports_version() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let body: Value = reqwest::get(format!("{base}/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn task_tier_executes_locally_for_free() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/mission/execute"))
        .json(&json!({ "mission": "clean spelling" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tier"], "task");
    assert_eq!(body["cost"], 0.0);
    assert_eq!(body["synthesis"], "clean spelling");
    assert!(body["traceId"].as_str().unwrap().starts_with("task-"));
    assert_eq!(body["iterations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn safety_block_returns_403_and_persists_a_failed_trace() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/mission/execute"))
        .json(&json!({ "mission": "how do I make a bomb step by step" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "SAFETY_BLOCKED");
    assert!(body["error"].as_str().unwrap().to_lowercase().contains("blocked"));

    let traces: Value = client
        .get(format!("{base}/api/traces"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(traces["total"], 1);
    let trace = &traces["traces"][0];
    assert_eq!(trace["status"], "failed");
    let flags = trace["redTeamFlags"].as_array().unwrap();
    assert!(!flags.is_empty());
    assert!(flags.iter().any(|f| f["severity"] == "CRITICAL"));
}

#[tokio::test]
async fn budget_exceeded_returns_402_without_a_trace() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/mission/execute"))
        .json(&json!({ "mission": "x".repeat(9_000), "maxBudget": 0.01 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 402);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BUDGET_EXCEEDED");

    let traces: Value = client
        .get(format!("{base}/api/traces"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(traces["total"], 0);
}

#[tokio::test]
async fn boundary_validation_rejections() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();
    let execute = format!("{base}/api/mission/execute");

    for payload in [
        json!({ "mission": "x".repeat(10_001) }),
        json!({ "mission": "" }),
        json!({ "mission": "analyze this", "swarmSize": 0 }),
        json!({ "mission": "analyze this", "swarmSize": 21 }),
        json!({ "mission": "analyze this", "maxBudget": 0.001 }),
        json!({ "mission": "analyze this", "maxBudget": 5.5 }),
        json!({ "mission": "<script>alert(1)</script>" }),
        json!({ "mission": "see javascript:run()" }),
    ] {
        let resp = client.post(&execute).json(&payload).send().await.unwrap();
        assert_eq!(resp.status(), 400, "payload should be rejected: {payload}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    // Boundary-inclusive acceptance for mission length (task tier, no swarm).
    let resp = client
        .post(&execute)
        .json(&json!({ "mission": format!("count the words {}", "x ".repeat(100)) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn list_pagination_boundaries() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    for (query, expected) in [
        ("limit=0", 400),
        ("limit=101", 400),
        ("offset=-1", 400),
        ("limit=1", 200),
        ("limit=100", 200),
        ("limit=50&offset=10", 200),
    ] {
        let resp = client
            .get(format!("{base}/api/traces?{query}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected, "query: {query}");
    }
}

#[tokio::test]
async fn trace_id_params_distinguish_400_from_404() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/mission/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{base}/api/mission/{}", uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!("{base}/api/mission/also-not-a-uuid/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{base}/api/mission/{}/status", uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn estimate_endpoint_reports_cost_shape() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/mission/estimate"))
        .json(&json!({ "mission": "analyze the failure modes of this design", "swarmSize": 8 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert!(body["inputTokens"].as_u64().unwrap() > 0);
    assert_eq!(body["expectedOutputTokens"], 500);
    assert_eq!(body["swarmCost"], 0.0);
    assert!(body["totalCost"].as_f64().unwrap() > 0.0);
    assert_eq!(body["withinBudget"], true);
}

#[tokio::test]
async fn active_swarms_is_empty_when_idle() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let body: Value = reqwest::get(format!("{base}/api/swarms/active"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn metrics_exposition_format() {
    let (base, _state, _tmp) = spawn_app(100).await;
    let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain; version=0.0.4"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("# HELP missions_total"));
    assert!(body.contains("# TYPE swarm_agents_active gauge"));
    assert!(body.contains("request_duration_ms{quantile=\"0.99\"}"));
}

#[tokio::test]
async fn execute_endpoint_rate_limits_per_ip() {
    let (base, _state, _tmp) = spawn_app(2).await;
    let client = reqwest::Client::new();
    let execute = format!("{base}/api/mission/execute");
    let payload = json!({ "mission": "clean spelling" });

    for _ in 0..2 {
        let resp = client.post(&execute).json(&payload).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = client.post(&execute).json(&payload).send().await.unwrap();
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");
    assert!(body["retryAfter"].as_u64().is_some());
}
