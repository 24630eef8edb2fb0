use crate::state_machine::PaymentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payment aggregate. `(customer_id, idempotency_key)` is unique;
/// `state_version` increments by exactly one on every successful transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub state_version: i64,
    pub idempotency_key: String,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape as it comes back from sqlx — `status` is TEXT on the wire.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub state_version: i64,
    pub idempotency_key: String,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_payment(self) -> Result<Payment, String> {
        Ok(Payment {
            payment_id: self.payment_id,
            customer_id: self.customer_id,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status: self.status.parse()?,
            state_version: self.state_version,
            idempotency_key: self.idempotency_key,
            correlation_id: self.correlation_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Append-only audit row: one per transition. Timeline rows form a
/// contiguous chain — each row's `from_state` equals the previous row's
/// `to_state`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelineEntry {
    pub id: i64,
    pub payment_id: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub reason: String,
    pub event_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

/// Result classification for a single provider-interaction attempt, kept as
/// an append-only log per payment.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentAttempt {
    pub id: i64,
    pub payment_id: Uuid,
    pub attempt_no: i32,
    pub outcome: String,
    pub recorded_at: DateTime<Utc>,
}
