use event_bus::EventEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_PAYMENTS_REQUESTED: &str = "payments.requested";
pub const TOPIC_PAYMENTS_FAILED: &str = "payments.failed";
pub const TOPIC_RISK_APPROVED: &str = "risk.approved";
pub const TOPIC_RISK_DENIED: &str = "risk.denied";

const SOURCE_MODULE: &str = "risk-engine";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequested {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub idempotency_key: String,
}

/// Consumed to feed the failure-rate heuristic; not re-published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub classification: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskApproved {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDenied {
    pub payment_id: Uuid,
    /// `DENY` (terminal) or `REVIEW` (held for manual review).
    pub classification: String,
    pub reason: String,
}

pub fn envelope<T>(aggregate_id: Uuid, event_type: &str, correlation_id: &str, payload: T) -> EventEnvelope<T> {
    EventEnvelope::new(
        "default".to_string(),
        SOURCE_MODULE.to_string(),
        aggregate_id.to_string(),
        event_type.to_string(),
        payload,
    )
    .with_correlation_id(Some(correlation_id.to_string()))
}
