//! Settings and diagnostics pages' APIs.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use database::admin_user;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::state::AppState;

pub async fn admin_users(State(state): State<AppState>) -> Result<Json<Value>> {
    let users = admin_user::list_admin_users(state.db.pool()).await?;
    Ok(Json(json!({ "success": true, "data": { "users": users } })))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub service: &'static str,
    pub status: CheckStatus,
    /// Milliseconds.
    pub response_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Database connectivity and integration configuration.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let mut results = Vec::new();

    let started = Instant::now();
    let ping = state.db.ping().await;
    results.push(CheckResult {
        service: "Database",
        status: if ping.is_ok() {
            CheckStatus::Healthy
        } else {
            CheckStatus::Error
        },
        response_time: elapsed_ms(started),
        details: ping.is_ok().then(|| "Connection successful".to_string()),
        error: ping.err().map(|e| e.to_string()),
    });

    let started = Instant::now();
    let mut missing = Vec::new();
    if state.wasender.is_none() {
        missing.push("WASENDER_API_KEY");
    }
    if state.agent.is_none() {
        missing.extend(["LANGGRAPH_API_URL", "LANGSMITH_API_KEY", "BARGAINB_ASSISTANT_ID"]);
    }
    results.push(CheckResult {
        service: "Environment Variables",
        status: if missing.is_empty() {
            CheckStatus::Healthy
        } else {
            CheckStatus::Warning
        },
        response_time: elapsed_ms(started),
        details: Some(if missing.is_empty() {
            "All required variables present".to_string()
        } else {
            format!("Missing: {}", missing.join(", "))
        }),
        error: None,
    });

    Json(health_report(&results, &database::now()))
}

fn health_report(results: &[CheckResult], timestamp: &str) -> Value {
    let count = |status: CheckStatus| results.iter().filter(|r| r.status == status).count();
    let healthy = count(CheckStatus::Healthy);
    let warnings = count(CheckStatus::Warning);
    let errors = count(CheckStatus::Error);

    let overall = if errors > 0 {
        CheckStatus::Error
    } else if warnings > 0 {
        CheckStatus::Warning
    } else {
        CheckStatus::Healthy
    };

    json!({
        "success": true,
        "data": {
            "overall": {
                "status": overall,
                "summary": format!("{} healthy, {} warnings, {} errors", healthy, warnings, errors),
                "timestamp": timestamp,
            },
            "results": results,
            "stats": {
                "total": results.len(),
                "healthy": healthy,
                "warnings": warnings,
                "errors": errors,
            },
        },
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: CheckStatus) -> CheckResult {
        CheckResult {
            service: "x",
            status,
            response_time: 1,
            details: None,
            error: None,
        }
    }

    #[test]
    fn worst_status_wins() {
        let report = health_report(
            &[check(CheckStatus::Healthy), check(CheckStatus::Warning)],
            "2025-01-01T00:00:00.000Z",
        );
        assert_eq!(report["data"]["overall"]["status"], "warning");
        assert_eq!(report["data"]["overall"]["summary"], "1 healthy, 1 warnings, 0 errors");
        assert_eq!(report["data"]["stats"]["total"], 2);

        let report = health_report(&[check(CheckStatus::Error), check(CheckStatus::Warning)], "t");
        assert_eq!(report["data"]["overall"]["status"], "error");
    }

    #[test]
    fn results_use_camel_case() {
        let value = serde_json::to_value(check(CheckStatus::Healthy)).unwrap();
        assert_eq!(value["responseTime"], 1);
        assert_eq!(value["status"], "healthy");
        assert!(value.get("details").is_none());
    }
}
