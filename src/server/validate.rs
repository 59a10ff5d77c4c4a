//! Boundary validation for the HTTP API.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::error::ApiError;

pub const MISSION_MAX_CHARS: usize = 10_000;
pub const SWARM_SIZE_MAX: u64 = 20;
pub const MAX_BUDGET_MIN: f64 = 0.01;
pub const MAX_BUDGET_MAX: f64 = 5.0;
pub const LIST_LIMIT_MAX: i64 = 100;
pub const LIST_LIMIT_DEFAULT: usize = 50;

// XSS-shaped substrings rejected outright.
static XSS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script|javascript:|on\w+\s*=").unwrap());

/// Validate the mission text: required, bounded, no script-looking content.
pub fn validate_mission(mission: &str) -> Result<(), ApiError> {
    let chars = mission.chars().count();
    if chars == 0 {
        return Err(ApiError::Validation("mission must not be empty".into()));
    }
    if chars > MISSION_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "mission must be at most {MISSION_MAX_CHARS} characters (got {chars})"
        )));
    }
    if XSS_RE.is_match(mission) {
        return Err(ApiError::Validation(
            "mission contains disallowed content".into(),
        ));
    }
    Ok(())
}

/// Validate an optional swarm size into the [1, 20] range.
pub fn validate_swarm_size(swarm_size: Option<u64>) -> Result<Option<usize>, ApiError> {
    match swarm_size {
        None => Ok(None),
        Some(n) if (1..=SWARM_SIZE_MAX).contains(&n) => Ok(Some(n as usize)),
        Some(n) => Err(ApiError::Validation(format!(
            "swarmSize must be between 1 and {SWARM_SIZE_MAX} (got {n})"
        ))),
    }
}

/// Validate an optional budget into the [0.01, 5.0] USD range.
pub fn validate_max_budget(max_budget: Option<f64>) -> Result<Option<f64>, ApiError> {
    match max_budget {
        None => Ok(None),
        Some(b) if b.is_finite() && (MAX_BUDGET_MIN..=MAX_BUDGET_MAX).contains(&b) => Ok(Some(b)),
        Some(b) => Err(ApiError::Validation(format!(
            "maxBudget must be between {MAX_BUDGET_MIN} and {MAX_BUDGET_MAX} (got {b})"
        ))),
    }
}

/// Parse a trace id path parameter. A malformed id is 400, never 404.
pub fn parse_trace_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::Validation(format!("traceId must be a UUID (got {raw:?})")))
}

/// Validate list pagination: limit in [1, 100] defaulting to 50, offset >= 0.
pub fn validate_pagination(
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<(usize, usize), ApiError> {
    let limit = match limit {
        None => LIST_LIMIT_DEFAULT,
        Some(l) if (1..=LIST_LIMIT_MAX).contains(&l) => l as usize,
        Some(l) => {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {LIST_LIMIT_MAX} (got {l})"
            )))
        }
    };
    let offset = match offset {
        None => 0,
        Some(o) if o >= 0 => o as usize,
        Some(o) => {
            return Err(ApiError::Validation(format!(
                "offset must be >= 0 (got {o})"
            )))
        }
    };
    Ok((limit, offset))
}
