//! Event payload contracts the ledger consumes and publishes.

use event_bus::EventEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_PAYMENTS_CAPTURED: &str = "payments.captured";
pub const TOPIC_PAYMENTS_SETTLED: &str = "payments.settled";

const SOURCE_MODULE: &str = "ledger";

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
