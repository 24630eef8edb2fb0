use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per terminal payment event this service has observed. Purely
/// consumer-side: notification-sink never emits an event of its own.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub payment_id: Uuid,
    pub outcome: String,
    pub reason: Option<String>,
    pub event_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}
