//! Event payload contracts this service consumes. It never publishes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_PAYMENTS_SETTLED: &str = "payments.settled";
pub const TOPIC_PAYMENTS_FAILED: &str = "payments.failed";
pub const TOPIC_PAYMENTS_REVERSED: &str = "payments.reversed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettled {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub payment_id: Uuid,
    pub classification: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReversed {
    pub payment_id: Uuid,
    pub reason: String,
}
