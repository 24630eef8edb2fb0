//! Event payload contracts the provider adapter consumes and publishes.

use event_bus::EventEnvelope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_PROVIDER_AUTHORIZE_REQUESTED: &str = "provider.authorize.requested";
pub const TOPIC_PAYMENTS_AUTHORIZED: &str = "payments.authorized";
pub const TOPIC_PAYMENTS_FAILED: &str = "payments.failed";

const SOURCE_MODULE: &str = "provider-adapter";

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
    /// `DECLINE`, `RETRY_EXHAUSTED`, or `NON_RETRYABLE`.
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
