//! Shared health and readiness check endpoints for all services.
//!
//! Every service in the saga exposes the same two probes so operators and
//! orchestration tooling don't need a different contract per service:
//!
//! - `/health/live` — process is up; never touches the database or broker.
//! - `/health/ready` — dependencies (database pool, event bus) are reachable.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// A dependency a readiness probe can check (database pool, broker client, ...).
#[async_trait::async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Human-readable name reported in the readiness payload (e.g. "database").
    fn name(&self) -> &'static str;

    /// Return `Ok(())` if the dependency is reachable.
    async fn check(&self) -> Result<(), String>;
}

/// Shared state behind the health routes: the service name plus the set of
/// dependencies its readiness probe walks through.
pub struct HealthState {
    pub service: &'static str,
    pub checks: Vec<Box<dyn ReadinessCheck>>,
}

impl HealthState {
    pub fn new(service: &'static str, checks: Vec<Box<dyn ReadinessCheck>>) -> Arc<Self> {
        Arc::new(Self { service, checks })
    }
}

/// Liveness probe: always 200 as long as the process can schedule a task.
pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: runs every registered check and fails closed on the first error.
pub async fn health_ready(
    State(state): State<Arc<HealthState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut statuses = serde_json::Map::new();

    for check in &state.checks {
        match check.check().await {
            Ok(()) => {
                statuses.insert(check.name().to_string(), json!("connected"));
            }
            Err(reason) => {
                statuses.insert(check.name().to_string(), json!(reason));
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "not_ready",
                        "service": state.service,
                        "dependencies": statuses,
                    })),
                ));
            }
        }
    }

    Ok(Json(json!({
        "status": "ready",
        "service": state.service,
        "dependencies": statuses,
    })))
}

/// Simple, dependency-free health body for services that don't yet wire up
/// readiness checks (mirrors the teacher's `/api/health` shape).
pub fn health_simple(service: &'static str, version: &'static str) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": service,
        "version": version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysOk;

    #[async_trait::async_trait]
    impl ReadinessCheck for AlwaysOk {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn check(&self) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl ReadinessCheck for AlwaysFails {
        fn name(&self) -> &'static str {
            "stub"
        }
        async fn check(&self) -> Result<(), String> {
            Err("unreachable".to_string())
        }
    }

    #[tokio::test]
    async fn live_is_always_ok() {
        assert_eq!(health_live().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_reports_failure() {
        let state = HealthState::new("test-service", vec![Box::new(AlwaysFails)]);
        let result = health_ready(State(state)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ready_reports_success() {
        let state = HealthState::new("test-service", vec![Box::new(AlwaysOk)]);
        let result = health_ready(State(state)).await;
        assert!(result.is_ok());
    }
}
