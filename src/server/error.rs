//! HTTP error taxonomy.
//!
//! Every user-visible failure maps to a status code, a stable error code, and
//! a human-readable message. Stack traces and internal details never leave
//! the process; unexpected errors are logged and collapsed to a generic 500.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::swarm::SwarmError;

#[derive(Debug)]
pub enum ApiError {
    /// Boundary validation failed.
    Validation(String),
    /// Unknown trace id.
    NotFound(String),
    /// Estimate exceeded the mission budget.
    BudgetExceeded { estimated: f64, budget: f64 },
    /// Input scan blocked the mission; the failed trace is persisted.
    SafetyBlocked { trace_id: Uuid },
    /// Boundary rate limiter or upstream 429 exhaustion.
    RateLimited { retry_after_secs: u64 },
    /// Upstream failure that ended the mission.
    UpstreamFailed(String),
    /// Anything unexpected.
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            ApiError::SafetyBlocked { .. } => "SAFETY_BLOCKED",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::UpstreamFailed(_) => "UPSTREAM_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BudgetExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::SafetyBlocked { .. } => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation(m) => m.clone(),
            ApiError::NotFound(m) => m.clone(),
            ApiError::BudgetExceeded { estimated, budget } => format!(
                "estimated cost ${estimated:.4} exceeds the mission budget ${budget:.2}"
            ),
            ApiError::SafetyBlocked { .. } => "Mission blocked by safety system".to_string(),
            ApiError::RateLimited { retry_after_secs } => {
                format!("rate limited, retry after {retry_after_secs}s")
            }
            ApiError::UpstreamFailed(m) => m.clone(),
            ApiError::Internal(_) => "internal error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Internal error surfaced to client");
        }

        let mut body = json!({
            "error": self.message(),
            "code": self.code(),
        });
        match &self {
            ApiError::RateLimited { retry_after_secs } => {
                body["retryAfter"] = json!(retry_after_secs);
            }
            ApiError::SafetyBlocked { trace_id } => {
                body["traceId"] = json!(trace_id);
            }
            _ => {}
        }

        let mut response = (self.status(), Json(body)).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(v) = retry_after_secs.to_string().parse() {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, v);
            }
        }
        response
    }
}

impl From<SwarmError> for ApiError {
    fn from(e: SwarmError) -> Self {
        match e {
            SwarmError::SafetyBlocked { trace_id } => ApiError::SafetyBlocked { trace_id },
            SwarmError::BudgetExceeded { estimated, budget } => {
                ApiError::BudgetExceeded { estimated, budget }
            }
            SwarmError::SynthesisFailed { message, .. } => ApiError::UpstreamFailed(message),
            SwarmError::Cancelled { .. } => ApiError::Internal("mission cancelled".to_string()),
            SwarmError::Provider(p) => match p {
                crate::gateway::ProviderError::RateLimited { retry_after, .. } => {
                    ApiError::RateLimited {
                        retry_after_secs: retry_after.as_secs(),
                    }
                }
                other => ApiError::UpstreamFailed(other.to_string()),
            },
        }
    }
}
