//! Event payload contracts the orchestrator publishes and consumes.
//!
//! Topic names are the wire contract between services; keep them here as
//! constants rather than scattering string literals through the consumers.

use event_bus::EventEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_PAYMENTS_REQUESTED: &str = "payments.requested";
pub const TOPIC_PROVIDER_AUTHORIZE_REQUESTED: &str = "provider.authorize.requested";
pub const TOPIC_PAYMENTS_AUTHORIZED: &str = "payments.authorized";
pub const TOPIC_PAYMENTS_FAILED: &str = "payments.failed";
pub const TOPIC_PAYMENTS_CAPTURED: &str = "payments.captured";
pub const TOPIC_PAYMENTS_SETTLED: &str = "payments.settled";
pub const TOPIC_PAYMENTS_REVERSED: &str = "payments.reversed";

pub const TOPIC_RISK_APPROVED: &str = "risk.approved";
pub const TOPIC_RISK_DENIED: &str = "risk.denied";

const SOURCE_MODULE: &str = "orchestrator";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequested {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub idempotency_key: String,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAuthorizeRequested {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAuthorized {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub payment_id: Uuid,
    pub customer_id: String,
    /// `DECLINE`, `TIMEOUT`, `MALFORMED`, `RETRY_EXHAUSTED`, or `RISK_DENIED`.
    pub classification: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCaptured {
    pub payment_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettled {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReversed {
    pub payment_id: Uuid,
    pub reason: String,
}

/// Build an envelope for an event the orchestrator produces. `event_id`
/// should be derived deterministically by the caller when it needs to be
/// stable across retries (see `EventEnvelope::with_event_id`).
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
