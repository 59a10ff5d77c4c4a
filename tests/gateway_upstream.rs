use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quorum_harness::gateway::openrouter::{ChatProvider, OpenRouterAdapter};
use quorum_harness::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, FinishReason, GatewayConfig, NoopUsageSink,
    ProviderError, ProviderGateway,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn adapter_for(server: &MockServer) -> OpenRouterAdapter {
    OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
        .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        ChatModel::openrouter("anthropic/claude-3-5-sonnet"),
        vec![quorum_harness::gateway::Message::user("hi")],
        Attribution::new("test"),
    )
}

#[tokio::test]
async fn adapter_parses_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "hello" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 20 }
        })))
        .mount(&server)
        .await;

    let resp = adapter_for(&server).chat(&request()).await.unwrap();
    assert_eq!(resp.content, "hello");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 10);
    assert_eq!(resp.output_tokens, 20);
    assert_eq!(
        resp.cost_nanodollars,
        quorum_harness::gateway::chat_cost("anthropic/claude-3-5-sonnet", 10, 20)
    );
}

#[tokio::test]
async fn adapter_classifies_429_with_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-request-id", "abc123")
                .set_body_json(json!({
                    "error": { "message": "rate limited", "code": "rate_limit_exceeded" }
                })),
        )
        .mount(&server)
        .await;

    let err = adapter_for(&server).chat(&request()).await.unwrap_err();
    match err {
        ProviderError::RateLimited {
            retry_after,
            context,
        } => {
            assert_eq!(retry_after, Duration::from_secs(60));
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(429));
            assert_eq!(ctx.provider_code.as_deref(), Some("rate_limit_exceeded"));
            assert_eq!(ctx.request_id.as_deref(), Some("abc123"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn adapter_surfaces_4xx_as_non_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "bad request", "code": "invalid" }
        })))
        .mount(&server)
        .await;

    let err = adapter_for(&server).chat(&request()).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn adapter_marks_5xx_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "overloaded", "code": "overloaded" }
        })))
        .mount(&server)
        .await;

    let err = adapter_for(&server).chat(&request()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[derive(Clone)]
struct FlipResponder {
    calls: Arc<AtomicUsize>,
    first: ResponseTemplate,
    second: ResponseTemplate,
}

impl Respond for FlipResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            self.first.clone()
        } else {
            self.second.clone()
        }
    }
}

fn ok_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
    }))
}

#[tokio::test]
async fn gateway_retries_retryable_errors_and_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FlipResponder {
            calls: Arc::new(AtomicUsize::new(0)),
            first: ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "transient error", "code": "internal" }
            })),
            second: ok_response("ok"),
        })
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter_for(&server),
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 1,
            retry_base_delay: Duration::from_millis(0),
            retry_max_delay: Duration::from_millis(0),
        },
    );

    let resp = gateway.chat(request(), None).await.unwrap();
    assert_eq!(resp.content, "ok");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn gateway_does_not_retry_permanent_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "bad request", "code": "invalid" }
        })))
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter_for(&server),
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 5,
            retry_base_delay: Duration::from_millis(0),
            retry_max_delay: Duration::from_millis(0),
        },
    );

    let err = gateway.chat(request(), None).await.unwrap_err();
    assert!(!err.is_retryable());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn gateway_exhausts_retries_and_surfaces_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "rate limited", "code": "rate_limit_exceeded" }
        })))
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter_for(&server),
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 2,
            retry_base_delay: Duration::from_millis(0),
            retry_max_delay: Duration::from_millis(0),
        },
    );

    let err = gateway.chat(request(), None).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { .. }));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn cancellation_aborts_pending_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "transient", "code": "internal" }
        })))
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter_for(&server),
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 50,
            retry_base_delay: Duration::from_millis(20),
            retry_max_delay: Duration::from_millis(20),
        },
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flag.store(true, Ordering::Relaxed);
    });

    let err = gateway
        .chat_cancellable(request(), Some(cancel))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled));

    // Far fewer than the 51 attempts a full retry run would make.
    let received = server.received_requests().await.unwrap();
    assert!(received.len() < 10);
}

#[tokio::test]
async fn missing_credential_fails_fast() {
    std::env::remove_var("OPENROUTER_API_KEY");
    let err = OpenRouterAdapter::from_env().unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));
}
